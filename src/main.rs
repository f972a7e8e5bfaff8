//! # fleetnode 웹 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 설정 로딩
//! 4. 공유 세션 저장소 연결 (실패해도 degraded 상태로 계속 진행)
//! 5. 업로드 전송 계층 준비
//! 6. 라우터 설정과 HTTP 서버 시작
//! 7. SIGTERM / Ctrl-C를 받으면 요청을 정리하고 저장소 연결을 한 번만 닫고 종료

use anyhow::Result; // main 전용 에러 타입: 어떤 에러든 ?로 전파하고 메시지로 출력
use fleetnode::{
    config::Config,            // 환경변수 설정
    routes::{self, AppState},  // 라우터 조립과 공유 상태
    services, store,
    store::SessionStore,       // 공유 세션 저장소 핸들
};
use tower_http::{
    cors::{Any, CorsLayer}, // CORS 미들웨어 (브라우저 교차 출처 요청 허용)
    trace::TraceLayer,      // HTTP 요청/응답 자동 로깅
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // 로깅 초기화 유틸리티

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // RUST_LOG가 없으면 fleetnode, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetnode=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    // 프로덕션에서 SESSION_SECRET이 없으면 여기서 종료합니다.
    let config = Config::from_env()?;
    tracing::info!(
        instance = %config.instance_id,
        "Starting fleetnode on {}:{}",
        config.host,
        config.port
    );

    // ── 4단계: 공유 세션 저장소 연결 ──
    // URL이 잘못된 경우만 시작을 중단합니다. 연결 실패는 감시자가 재시도합니다.
    let transport = store::open_transport(&config.store_url)?;
    let session_store = SessionStore::connect(transport, config.store_options()).await;

    // ── 5단계: 업로드 전송 계층 ──
    let uploads = services::open_upload_transport(&config);

    // ── 6단계: 라우터 설정 ──
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, session_store.clone(), uploads);

    // 개발 환경 기준으로 모든 출처를 허용합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // .layer(): 라우터 전체를 감싸는 미들웨어. 나중에 추가한 레이어가 바깥쪽입니다.
    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()); // HTTP 요청/응답 자동 로깅

    // ── 7단계: 서버 시작 ──
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    // with_graceful_shutdown(): 신호가 오면 새 연결을 받지 않고, 진행 중인 요청이 끝날 때까지 기다립니다.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 진행 중인 요청이 모두 끝난 뒤, 저장소 연결을 정확히 한 번 닫습니다.
    session_store.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// SIGTERM(컨테이너 종료) 또는 Ctrl-C를 기다립니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl-C received: closing HTTP server"),
        _ = terminate => tracing::info!("SIGTERM received: closing HTTP server"),
    }
}

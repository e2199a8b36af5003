use std::sync::Arc;

use skillmatch_live::{
    notify::{Hooks, LogNotifier},
    Dashboard,
};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let url =
        std::env::var("SKILLMATCH_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());

    let dashboard = Dashboard::new(&url).unwrap_or_else(|e| {
        println!("{}", e);
        std::process::exit(1);
    });

    match dashboard.roadmap().await {
        Ok(roadmap) => log::info!("Roadmap has {} phases", roadmap.phases.len()),
        Err(e) => log::warn!("Failed to load roadmap: {}", e),
    }

    match dashboard.interview_questions().await {
        Ok(q) => log::info!("Loaded {} interview questions", q.questions.len()),
        Err(e) => log::warn!("Failed to load interview questions: {}", e),
    }

    let hooks = Hooks::new(
        Arc::new(LogNotifier),
        Arc::new(|| log::info!("Reload recent uploads")),
    )
    .with_file_info(Arc::new(|name: &str| log::info!("Uploaded file: {}", name)));

    let _client = dashboard.start_realtime(hooks).unwrap_or_else(|e| {
        println!("{}", e);
        std::process::exit(1);
    });

    std::future::pending::<()>().await;
}

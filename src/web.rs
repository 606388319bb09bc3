//! Liveness endpoints for the hosting platform.

use std::{io, net::SocketAddr, sync::Arc};

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::database::connection::Ping;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
    pub database: bool,
}

async fn index() -> &'static str {
    "🎯 Vocabulary bot is running"
}

async fn health<Store: Ping + Send + Sync + 'static>(State(store): State<Arc<Store>>) -> Json<Health> {
    let database = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Database ping failed: {}", e);
            false
        }
    };

    Json(Health {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}

pub fn router<Store: Ping + Send + Sync + 'static>(store: Arc<Store>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health::<Store>))
        .with_state(store)
}

pub async fn serve(addr: SocketAddr, app: Router) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on {}", addr);
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use crate::database::connection::StoreError;

    use super::*;

    struct FixedPing(bool);

    impl Ping for FixedPing {
        async fn ping(&self) -> Result<(), StoreError> {
            if self.0 {
                Ok(())
            } else {
                Err("connection refused".into())
            }
        }
    }

    #[tokio::test]
    async fn healthy_database() {
        let Json(report) = health(State(Arc::new(FixedPing(true)))).await;
        assert_eq!(
            report,
            Health {
                status: "ok",
                database: true
            }
        );
    }

    #[tokio::test]
    async fn unreachable_database_degrades() {
        let Json(report) = health(State(Arc::new(FixedPing(false)))).await;
        assert_eq!(report.status, "degraded");
        assert!(!report.database);
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"status":"degraded","database":false}"#
        );
    }

    #[tokio::test]
    async fn serves_on_an_ephemeral_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(FixedPing(true)))).await.unwrap();
        });

        let body = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, r#"{"status":"ok","database":true}"#);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("store: {0}")]
    Store(#[from] deals_api::StoreError),

    #[error("push client: {0}")]
    Push(#[from] deals_api::PushError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}

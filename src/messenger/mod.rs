pub mod telegram;

/// Rendering flags for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub render_as_html: bool,
    pub suppress_link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            render_as_html: true,
            suppress_link_preview: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The chat API received the message and rejected it.
    #[error("chat API rejected message ({code}): {description}")]
    Api { code: u16, description: String },

    #[error("chat API unreachable: {0}")]
    Connectivity(String),
}

pub trait Messenger {
    fn send(&self, channel: &str, text: &str, options: SendOptions) -> Result<(), DeliveryError>;
}

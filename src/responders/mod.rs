//! Chat command responders.
//!
//! A [`Responder`] looks at each inbound `PRIVMSG` and, if it matches, answers
//! over the connection. The [`Registry`] is built once at startup and handed
//! to the event loop; it never changes afterwards.

mod greeting;
mod static_reply;

pub use greeting::Greeting;
pub use static_reply::StaticReply;

use async_trait::async_trait;
use tmi_proto::Message;
use tracing::{Instrument, debug, warn};

use crate::config::ResponderConfig;
use crate::error::ConnectionError;
use crate::network::Connection;
use crate::telemetry::spans;

/// Result type for responders.
pub type ResponderResult = Result<(), ConnectionError>;

/// Trait implemented by all chat command responders.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether this responder wants `msg`.
    fn matches(&self, msg: &Message) -> bool;

    /// Answer `msg`.
    async fn handle(&self, conn: &mut Connection, msg: &Message) -> ResponderResult;
}

/// Ordered, immutable set of responders.
#[derive(Default)]
pub struct Registry {
    responders: Vec<Box<dyn Responder>>,
}

/// Collects responders before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    responders: Vec<Box<dyn Responder>>,
}

impl RegistryBuilder {
    /// Append a responder. Dispatch follows insertion order.
    pub fn register<R: Responder + 'static>(mut self, responder: R) -> Self {
        self.responders.push(Box::new(responder));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            responders: self.responders,
        }
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The built-in greeting followed by every configured static reply.
    pub fn from_config(responders: &[ResponderConfig]) -> Self {
        responders
            .iter()
            .fold(Self::builder().register(Greeting), |builder, r| {
                builder.register(StaticReply::new(&r.trigger, &r.reply))
            })
            .build()
    }

    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }

    /// Run every responder that matches `msg`, in order.
    ///
    /// Returns how many matched. A failing responder is logged and does not
    /// stop the ones after it.
    pub async fn dispatch(&self, conn: &mut Connection, msg: &Message) -> usize {
        let mut matched = 0;
        for responder in self.responders.iter().filter(|r| r.matches(msg)) {
            matched += 1;
            let span = spans::responder(responder.name(), msg.source_nick());
            if let Err(e) = responder.handle(conn, msg).instrument(span).await {
                warn!(responder = responder.name(), error = %e, "Responder failed");
            }
        }
        if matched > 0 {
            debug!(matched, "Dispatched message");
        }
        matched
    }
}

//! Update routing
//!
//! Classifies one inbound update (text command or control activation),
//! runs the matching reply flow and delivers the result. Nothing is kept
//! between updates: every control activation re-derives its view from the
//! codename carried in the control token.

use axion_core::compose::{self, Flow};
use axion_core::{
    split_message, BuildKey, BuildRecord, CallbackAction, Command, DeviceView, Reply, Variant,
};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::build_fetch::BuildLookup;
use crate::registry_fetch::RegistryLoader;
use crate::telegram::{CallbackQuery, Messenger, TelegramError, Update};

/// Toast shown when the checksum control is tapped
const CHECKSUM_ACK: &str = "MD5 copied";

/// Handler-level failure, answered with an apology
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Build lookup task for {key} failed: {source}")]
    LookupTask {
        key: BuildKey,
        #[source]
        source: JoinError,
    },
}

/// Where a reply goes
#[derive(Debug, Clone, Copy)]
enum Target {
    /// New message(s) in a chat
    Chat(i64),
    /// Edit of the message that carried the activated control
    Edit { chat_id: i64, message_id: i64 },
}

/// Routes updates to reply flows
pub struct UpdateRouter<M> {
    registry: RegistryLoader,
    builds: BuildLookup,
    messenger: M,
    /// Longest text sent as one message
    max_message_len: usize,
}

impl<M: Messenger> UpdateRouter<M> {
    pub fn new(
        registry: RegistryLoader,
        builds: BuildLookup,
        messenger: M,
        max_message_len: usize,
    ) -> Self {
        Self {
            registry,
            builds,
            messenger,
            max_message_len,
        }
    }

    /// Handle one update. Failures never escape: flows that fail are
    /// answered with an apology and messaging errors are only logged.
    pub async fn handle(&self, update: Update) {
        if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
            return;
        }

        match update.message {
            Some(message) => match message.text {
                Some(text) => self.handle_text(message.chat.id, &text).await,
                None => debug!(update_id = ?update.update_id, "Ignoring message without text"),
            },
            None => debug!(update_id = ?update.update_id, "Ignoring unsupported update"),
        }
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        let action = query.data.as_deref().and_then(CallbackAction::parse);

        let ack = match action {
            Some(CallbackAction::ChecksumCopied) => Some(CHECKSUM_ACK),
            _ => None,
        };
        self.best_effort(
            "answerCallbackQuery",
            self.messenger.answer_callback(&query.id, ack).await,
        );

        let Some(message) = query.message else {
            debug!(callback = %query.id, "Control activation without a message");
            return;
        };
        let target = Target::Edit {
            chat_id: message.chat.id,
            message_id: message.message_id,
        };

        match action {
            Some(CallbackAction::Back { codename }) => {
                info!(codename = %codename, "Back to summary");
                self.run(target, Flow::Summary, self.summary_view(&codename)).await;
            }
            Some(CallbackAction::Details { action, codename }) => {
                info!(codename = %codename, variant = %action, "Build details requested");
                self.run(target, Flow::Details, self.detail_view(&action, &codename))
                    .await;
            }
            Some(CallbackAction::ChecksumCopied) => {}
            None => debug!(data = ?query.data, "Ignoring unrecognized control token"),
        }
    }

    async fn handle_text(&self, chat_id: i64, text: &str) {
        let Some(command) = Command::parse(text) else {
            return;
        };
        debug!(chat = chat_id, command = ?command, "Command received");

        let target = Target::Chat(chat_id);
        match command {
            Command::Start => self.deliver(target, compose::welcome()).await,
            Command::Help => self.deliver(target, compose::help()).await,
            Command::Devices => {
                let registry = self.registry.load().await;
                self.deliver(target, compose::device_catalog(&registry)).await;
            }
            Command::Axion(None) => self.deliver(target, compose::missing_codename()).await,
            Command::Axion(Some(codename)) => {
                info!(codename = %codename, "Build summary requested");
                self.run(target, Flow::Summary, self.summary_view(&codename)).await;
            }
        }
    }

    /// Summary view for a codename, or the not-found reply
    pub async fn summary_view(&self, codename: &str) -> Result<Reply, FlowError> {
        let registry = self.registry.load().await;
        let Some(device) = DeviceView::lookup(&registry, codename) else {
            return Ok(compose::not_found(&registry, codename));
        };

        let builds = self.lookup_variants(codename, &Variant::ALL).await?;
        Ok(compose::summary(&device, &builds))
    }

    /// Detail view for one (codename, variant)
    pub async fn detail_view(&self, action: &str, codename: &str) -> Result<Reply, FlowError> {
        let registry = self.registry.load().await;
        let Some(device) = DeviceView::lookup(&registry, codename) else {
            return Ok(compose::not_found(&registry, codename));
        };
        let Ok(variant) = action.parse::<Variant>() else {
            return Ok(compose::missing_variant(action, codename));
        };

        let reply = match self.lookup_variants(codename, &[variant]).await?.pop() {
            Some((_, Some(build))) => compose::detail(&device, variant, &build),
            _ => compose::missing_variant(variant.as_str(), codename),
        };
        Ok(reply)
    }

    /// Look up several variants concurrently, preserving their order
    async fn lookup_variants(
        &self,
        codename: &str,
        variants: &[Variant],
    ) -> Result<Vec<(Variant, Option<BuildRecord>)>, FlowError> {
        let tasks: Vec<_> = variants
            .iter()
            .map(|&variant| {
                let builds = self.builds.clone();
                let codename = codename.to_string();
                let task = tokio::spawn(async move { builds.lookup(&codename, variant).await });
                (variant, task)
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (variant, task) in tasks {
            let build = task.await.map_err(|source| FlowError::LookupTask {
                key: BuildKey::new(codename, variant),
                source,
            })?;
            results.push((variant, build));
        }
        Ok(results)
    }

    /// Run a flow, swapping a failure for the flow's apology, and deliver it
    async fn run(
        &self,
        target: Target,
        flow: Flow,
        view: impl std::future::Future<Output = Result<Reply, FlowError>>,
    ) {
        let reply = match view.await {
            Ok(reply) => reply,
            Err(e) => {
                error!(flow = ?flow, error = %e, "Reply flow failed");
                compose::apology(flow)
            }
        };
        self.deliver(target, reply).await;
    }

    async fn deliver(&self, target: Target, reply: Reply) {
        match target {
            Target::Chat(chat_id) => {
                let chunks = split_message(&reply.text, self.max_message_len);
                let last = chunks.len().saturating_sub(1);
                if last > 0 {
                    debug!(chat = chat_id, parts = chunks.len(), "Splitting long reply");
                }

                for (i, chunk) in chunks.into_iter().enumerate() {
                    let mut part = reply.clone();
                    part.text = chunk;
                    if i != last {
                        part.keyboard = None;
                    }
                    self.best_effort(
                        "sendMessage",
                        self.messenger.send_message(chat_id, &part).await,
                    );
                }
            }
            Target::Edit {
                chat_id,
                message_id,
            } => {
                self.best_effort(
                    "editMessageText",
                    self.messenger.edit_message(chat_id, message_id, &reply).await,
                );
            }
        }
    }

    fn best_effort(&self, operation: &str, result: Result<(), TelegramError>) {
        if let Err(e) = result {
            warn!(operation, error = %e, "Messaging call failed");
        }
    }
}

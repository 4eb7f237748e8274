//! Quick input service rendered with terminal prompts
//!
//! Prompts block, so each one runs on the blocking pool and holds the prompt
//! lock for as long as it is on screen. Cancellation resolves the call right
//! away, but a prompt already on screen stays there until the user answers
//! it; its answer is then discarded. The lock goes with the prompt, so later
//! prompts queue behind a cancelled one until it is answered.

use std::sync::Arc;

use async_trait::async_trait;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Password, Select};
use tokio::runtime::Handle;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use quickinput_core::{
    Error, InputConfig, ItemsFuture, PickItem, PickOptions, PickOutcome, ProgressSender,
    QuickInputService, Result, SessionDescriptor,
};

pub struct TerminalService {
    prompt_lock: Arc<Mutex<()>>,
}

impl TerminalService {
    pub fn new() -> Self {
        Self {
            prompt_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Wait for the items, then let the user choose among them
    async fn choose(
        &self,
        items: ItemsFuture,
        options: PickOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<PickItem>>> {
        let items = tokio::select! {
            items = items => items?,
            _ = cancel.cancelled() => return Ok(None),
        };
        if items.is_empty() {
            debug!("Nothing to pick from");
            return Ok(None);
        }

        let guard = self.lock(cancel).await;
        let Some(guard) = guard else { return Ok(None) };

        run_blocking(cancel, move || {
            let _guard = guard;
            prompt_pick(items, &options)
        })
        .await
    }

    async fn lock(&self, cancel: &CancellationToken) -> Option<OwnedMutexGuard<()>> {
        tokio::select! {
            guard = Arc::clone(&self.prompt_lock).lock_owned() => Some(guard),
            _ = cancel.cancelled() => None,
        }
    }

    async fn prompt_text(
        &self,
        config: InputConfig,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let Some(guard) = self.lock(cancel).await else {
            return Ok(None);
        };
        let runtime = Handle::current();

        run_blocking(cancel, move || {
            let _guard = guard;
            prompt_input(&config, &runtime)
        })
        .await
    }
}

impl Default for TerminalService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuickInputService for TerminalService {
    async fn pick(
        &self,
        items: ItemsFuture,
        options: PickOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<Option<PickOutcome>> {
        let can_pick_many = options.can_pick_many;
        let Some(chosen) = self.choose(items, options, &cancel).await? else {
            return Ok(None);
        };

        // The terminal has no live highlight, so report the final choice
        for item in &chosen {
            if progress.send(item.clone()).is_err() {
                break;
            }
        }

        Ok(outcome(chosen, can_pick_many))
    }

    async fn input(
        &self,
        config: InputConfig,
        cancel: CancellationToken,
    ) -> Result<Option<String>> {
        self.prompt_text(config, &cancel).await
    }

    async fn show(&self, session: SessionDescriptor) -> Result<Option<PickOutcome>> {
        // Sessions live until the user answers
        let cancel = CancellationToken::new();

        match session {
            SessionDescriptor::TextInput(text) => {
                let config = InputConfig {
                    password: text.password,
                    place_holder: text.place_holder,
                    prompt: text.prompt,
                    value: text.value,
                    ..Default::default()
                };
                self.prompt_text(config, &cancel).await?;
                Ok(None)
            }
            SessionDescriptor::PickOne(pick) => {
                let options = PickOptions {
                    place_holder: pick.place_holder,
                    ..PickOptions::single()
                };
                let chosen = self.choose(pick.items, options, &cancel).await?;
                Ok(chosen.and_then(|items| outcome(items, false)))
            }
            SessionDescriptor::PickMany(pick) => {
                let options = PickOptions {
                    place_holder: pick.place_holder,
                    ..PickOptions::many()
                };
                let chosen = self.choose(pick.items, options, &cancel).await?;
                Ok(chosen.and_then(|items| outcome(items, true)))
            }
        }
    }
}

/// Run a blocking prompt, giving up on it when `cancel` fires
async fn run_blocking<T, F>(cancel: &CancellationToken, prompt: F) -> Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<Option<T>> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(prompt);
    tokio::select! {
        result = task => result.map_err(|e| Error::Service(format!("prompt task failed: {}", e)))?,
        _ = cancel.cancelled() => {
            debug!("Prompt cancelled while on screen");
            Ok(None)
        }
    }
}

fn outcome(chosen: Vec<PickItem>, can_pick_many: bool) -> Option<PickOutcome> {
    if can_pick_many {
        return Some(PickOutcome::Many(chosen));
    }
    chosen.into_iter().next().map(PickOutcome::One)
}

/// One line per item: label, then dimmed description and detail
fn item_label(item: &PickItem, options: &PickOptions) -> String {
    let mut line = item.label.clone();
    if let Some(description) = &item.description {
        let description = if options.match_on_description {
            style(description).italic()
        } else {
            style(description).dim()
        };
        line.push_str(&format!("  {}", description));
    }
    if let Some(detail) = &item.detail {
        let detail = if options.match_on_detail {
            style(detail).italic()
        } else {
            style(detail).dim()
        };
        line.push_str(&format!("  {}", detail));
    }
    line
}

fn prompt_label(primary: Option<&str>, fallback: Option<&str>, default: &str) -> String {
    primary.or(fallback).unwrap_or(default).to_string()
}

fn prompt_pick(items: Vec<PickItem>, options: &PickOptions) -> Result<Option<Vec<PickItem>>> {
    let theme = ColorfulTheme::default();
    let labels: Vec<String> = items.iter().map(|item| item_label(item, options)).collect();
    let prompt = prompt_label(options.place_holder.as_deref(), None, "Select an item");

    let indices = if options.can_pick_many {
        let defaults: Vec<bool> = items.iter().map(|item| item.picked).collect();
        MultiSelect::with_theme(&theme)
            .with_prompt(prompt)
            .items(&labels)
            .defaults(&defaults)
            .interact_opt()
            .map_err(prompt_error)?
    } else {
        Select::with_theme(&theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(prompt_error)?
            .map(|index| vec![index])
    };

    Ok(indices.map(|indices| {
        indices
            .into_iter()
            .filter_map(|index| items.get(index).cloned())
            .collect()
    }))
}

/// Ask until the value passes validation.
///
/// Validation runs on the async runtime while this thread waits.
fn prompt_input(config: &InputConfig, runtime: &Handle) -> Result<Option<String>> {
    let theme = ColorfulTheme::default();
    let prompt = prompt_label(
        config.prompt.as_deref(),
        config.place_holder.as_deref(),
        "Enter a value",
    );
    let mut initial = config.value.clone().unwrap_or_default();

    loop {
        let value: String = if config.password {
            Password::with_theme(&theme)
                .with_prompt(prompt.as_str())
                .allow_empty_password(true)
                .interact()
                .map_err(prompt_error)?
        } else {
            Input::with_theme(&theme)
                .with_prompt(prompt.as_str())
                .with_initial_text(initial.as_str())
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_error)?
        };

        match runtime.block_on(config.validate(&value)) {
            None => return Ok(Some(value)),
            Some(message) => {
                eprintln!("  {} {}", style("✗").red().bold(), style(message).red());
                initial = value;
            }
        }
    }
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Service(format!("terminal prompt failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickinput_core::items_ready;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_empty_items_resolve_without_prompt() {
        let service = TerminalService::new();
        let (progress, mut rx) = mpsc::unbounded_channel();

        let outcome = service
            .pick(
                items_ready(Vec::new()),
                PickOptions::single(),
                progress,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_before_items_resolves_none() {
        let service = TerminalService::new();
        let (progress, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let never: ItemsFuture = {
            use futures::FutureExt;
            futures::future::pending().boxed().shared()
        };
        let outcome = service
            .pick(never, PickOptions::single(), progress, cancel)
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_rejected_items_propagate() {
        let service = TerminalService::new();
        let (progress, _rx) = mpsc::unbounded_channel();

        let failed: ItemsFuture = {
            use futures::FutureExt;
            futures::future::ready(Err(quickinput_core::RemoteError::new("no items")))
                .boxed()
                .shared()
        };
        let result = service
            .pick(failed, PickOptions::single(), progress, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::Remote(_))));
    }

    #[tokio::test]
    async fn test_cancelled_prompt_holds_lock_until_answered() {
        let service = TerminalService::new();
        let cancel = CancellationToken::new();
        let guard = service.lock(&cancel).await.unwrap();
        let (answer_tx, answer_rx) = std::sync::mpsc::channel::<()>();

        cancel.cancel();
        let result = run_blocking(&cancel, move || {
            let _guard = guard;
            let _ = answer_rx.recv();
            Ok(Some(()))
        })
        .await
        .unwrap();
        assert!(result.is_none());
        assert!(service.prompt_lock.try_lock().is_err());

        answer_tx.send(()).unwrap();
        let next = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            service.lock(&CancellationToken::new()),
        )
        .await
        .unwrap();
        assert!(next.is_some());
    }

    #[test]
    fn test_outcome_shape() {
        let items = vec![PickItem::new(1, "a"), PickItem::new(2, "b")];
        assert_eq!(
            outcome(items.clone(), false),
            Some(PickOutcome::One(PickItem::new(1, "a")))
        );
        assert_eq!(outcome(items.clone(), true), Some(PickOutcome::Many(items)));
        assert_eq!(outcome(Vec::new(), false), None);
    }

    #[test]
    fn test_item_label_includes_description() {
        console::set_colors_enabled(false);
        let item = PickItem::new(1, "main.rs").with_description("src");
        assert_eq!(item_label(&item, &PickOptions::single()), "main.rs  src");
    }

    #[test]
    fn test_prompt_label_fallbacks() {
        assert_eq!(prompt_label(Some("Name"), Some("hint"), "x"), "Name");
        assert_eq!(prompt_label(None, Some("hint"), "x"), "hint");
        assert_eq!(prompt_label(None, None, "x"), "x");
    }
}

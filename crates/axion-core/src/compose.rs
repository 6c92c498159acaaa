//! Reply composition
//!
//! Pure functions turning registry and build lookups into a message text
//! plus an inline control layout. Nothing here performs I/O.

use serde::Serialize;
use std::fmt::Write;

use crate::builds::{BuildRecord, Variant};
use crate::command::CallbackAction;
use crate::format::escape_markdown;
use crate::registry::Registry;

/// Maximum number of codenames offered when a lookup misses
pub const MAX_SUGGESTIONS: usize = 3;

/// Message formatting mode understood by the messaging platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

/// What a control does when activated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Opaque token routed back to the bot
    CallbackData(String),
    /// Link opened by the client
    Url(String),
}

/// A single inline control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    #[serde(flatten)]
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(text: impl Into<String>, action: &CallbackAction) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::CallbackData(action.token()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Inline control layout: rows of buttons, top to bottom
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Keyboard {
    pub inline_keyboard: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Append a row holding one button
    pub fn push(&mut self, button: Button) {
        self.inline_keyboard.push(vec![button]);
    }

    pub fn rows(&self) -> &[Vec<Button>] {
        &self.inline_keyboard
    }
}

/// A composed reply, ready to be sent or used to edit a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<Keyboard>,
    pub disable_preview: bool,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            keyboard: None,
            disable_preview: false,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Markdown),
            ..Self::plain(text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn without_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }

    /// Number of controls attached
    pub fn button_count(&self) -> usize {
        self.keyboard
            .as_ref()
            .map_or(0, |kb| kb.rows().iter().map(Vec::len).sum())
    }
}

/// Reply flows that can fail and need an apology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Summary,
    Details,
}

/// Everything the views need to know about one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceView<'a> {
    pub codename: &'a str,
    pub name: &'a str,
    pub maintainer: Option<&'a str>,
    pub support_group: Option<&'a str>,
}

impl<'a> DeviceView<'a> {
    /// Resolve a device from a registry snapshot; `None` if unknown
    pub fn lookup(registry: &'a Registry, codename: &'a str) -> Option<Self> {
        let name = registry.device_name(codename)?;
        Some(Self {
            codename,
            name,
            maintainer: registry.find_maintainer(codename),
            support_group: registry.support_group(codename),
        })
    }
}

pub fn welcome() -> Reply {
    Reply::plain(
        "Welcome to Axion Build Checker!\n\
         Use /axion <codename> to check latest builds\n\
         Example: /axion pipa\n\n\
         Use /devices to see all officially supported devices",
    )
}

pub fn help() -> Reply {
    Reply::markdown(
        "📱 *Axion Build Checker Commands:*\n\n\
         /start - Start the bot\n\
         /axion <codename> - Check builds for a specific device\n\
         /devices - List all officially supported devices\n\
         /help - Show this help message",
    )
}

pub fn missing_codename() -> Reply {
    Reply::plain("Please provide a device codename!\nExample: /axion a71")
}

/// Unknown codename, with up to [`MAX_SUGGESTIONS`] similar ones
pub fn not_found(registry: &Registry, codename: &str) -> Reply {
    let mut text = format!("Device \"{}\" not found in official devices list.", codename);

    let suggestions = registry.suggestions(codename, MAX_SUGGESTIONS);
    if !suggestions.is_empty() {
        text.push_str("\n\nDid you mean:");
        for (candidate, name) in suggestions {
            let _ = write!(text, "\n• {} ({})", candidate, name);
        }
    }

    Reply::plain(text)
}

pub fn no_builds(codename: &str) -> Reply {
    Reply::plain(format!("No builds found for {}!", codename))
}

/// No build for a requested variant (or an action that names no variant)
pub fn missing_variant(action: &str, codename: &str) -> Reply {
    Reply::plain(format!(
        "No {} build found for {}!",
        action.to_uppercase(),
        codename
    ))
}

/// Summary view: device header plus one control per variant with a build
///
/// Falls back to [`no_builds`] when no variant has data.
pub fn summary(device: &DeviceView<'_>, builds: &[(Variant, Option<BuildRecord>)]) -> Reply {
    if builds.iter().all(|(_, build)| build.is_none()) {
        return no_builds(device.codename);
    }

    let mut text = format!(
        "📱 *{}* ({})\n",
        escape_markdown(device.name),
        escape_markdown(device.codename)
    );
    if let Some(maintainer) = device.maintainer {
        let _ = writeln!(text, "👤 Maintainer: {}", escape_markdown(maintainer));
    }
    if let Some(group) = device.support_group {
        let _ = writeln!(text, "💬 [Support Group]({})", group);
    }
    text.push_str("\n*Available builds:*\n");

    let mut keyboard = Keyboard::default();
    for (variant, build) in builds {
        if let Some(build) = build {
            keyboard.push(Button::callback(
                variant.label(),
                &CallbackAction::details(*variant, device.codename),
            ));
            let _ = write!(
                text,
                "\n• {}: {}",
                variant.label(),
                escape_markdown(&build.version)
            );
        }
    }

    Reply::markdown(text)
        .with_keyboard(keyboard)
        .without_preview()
}

/// Detail view for one variant: version, date, size and download controls
pub fn detail(device: &DeviceView<'_>, variant: Variant, build: &BuildRecord) -> Reply {
    let mut text = format!(
        "⚡ *{} Build*\n📱 Device: {} ({})\n👤 Maintainer: {}",
        variant.as_str(),
        escape_markdown(device.name),
        escape_markdown(device.codename),
        device
            .maintainer
            .map_or_else(|| "Not specified".to_string(), escape_markdown),
    );
    if let Some(group) = device.support_group {
        let _ = write!(text, "\n💬 [Support Group]({})", group);
    }
    let _ = write!(
        text,
        "\n\n🔖 Version: {}\n📅 Date: {}\n📦 Size: {}",
        escape_markdown(&build.version),
        escape_markdown(&build.date),
        escape_markdown(&build.size)
    );

    let mut keyboard = Keyboard::default();
    keyboard.push(Button::url("⬇️ Download", build.url.as_str()));
    if let Some(checksum) = build.short_checksum() {
        keyboard.push(Button::callback(
            format!("📋 MD5: {}...", checksum),
            &CallbackAction::ChecksumCopied,
        ));
    }
    keyboard.push(Button::callback(
        "🔙 Back",
        &CallbackAction::back(device.codename),
    ));

    Reply::markdown(text)
        .with_keyboard(keyboard)
        .without_preview()
}

/// Full catalog grouped by manufacturer
pub fn device_catalog(registry: &Registry) -> Reply {
    if registry.is_empty() {
        return Reply::plain("No devices found. Please try again later.");
    }

    let mut text = String::from("📱 *Officially Supported Devices*\n\n");
    for group in registry.catalog() {
        let _ = writeln!(text, "*{}*", escape_markdown(group.manufacturer));
        for (codename, name) in group.devices {
            let _ = writeln!(text, "• {} (`{}`)", escape_markdown(name), codename);
        }
        text.push('\n');
    }
    text.push_str("Use /axion <codename> to check builds for a specific device");

    Reply::markdown(text).without_preview()
}

/// Generic apology for a failed flow; never carries upstream error detail
pub fn apology(flow: Flow) -> Reply {
    let text = match flow {
        Flow::Summary => "Failed to fetch build information. Please try again later.",
        Flow::Details => "Failed to fetch build details. Please try again later.",
    };
    Reply::plain(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::parse_flat_text;

    fn registry() -> Registry {
        parse_flat_text(
            "pipa=Xiaomi Pad 6=rmp=https://t.me/axion_pipa\n\
             marble=Poco F5\n\
             pipa_lite=Xiaomi Pad 6 Lite=rmp\n",
        )
    }

    fn build(version: &str, checksum: Option<&str>) -> BuildRecord {
        BuildRecord {
            filename: format!("axion-{}.zip", version),
            version: version.to_string(),
            size: "1.50 GB".to_string(),
            date: "2025-03-01 12:00:00".to_string(),
            url: format!("https://example.com/{}.zip", version),
            checksum: checksum.map(str::to_string),
        }
    }

    fn tokens(reply: &Reply) -> Vec<String> {
        reply
            .keyboard
            .iter()
            .flat_map(|kb| kb.rows().iter().flatten())
            .map(|button| match &button.action {
                ButtonAction::CallbackData(token) => token.clone(),
                ButtonAction::Url(url) => url.clone(),
            })
            .collect()
    }

    #[test]
    fn test_summary_with_both_variants() {
        let registry = registry();
        let device = DeviceView::lookup(&registry, "pipa").unwrap();
        let reply = summary(
            &device,
            &[
                (Variant::Vanilla, Some(build("1.0", None))),
                (Variant::Gms, Some(build("1.1", None))),
            ],
        );

        assert_eq!(reply.parse_mode, Some(ParseMode::Markdown));
        assert!(reply.disable_preview);
        assert_eq!(tokens(&reply), vec!["vanilla_pipa", "gms_pipa"]);
        assert!(reply.text.contains("*Xiaomi Pad 6* (pipa)"));
        assert!(reply.text.contains("👤 Maintainer: rmp"));
        assert!(reply.text.contains("[Support Group](https://t.me/axion_pipa)"));
        assert!(reply.text.contains("• Vanilla: 1.0"));
        assert!(reply.text.contains("• GMS: 1.1"));
    }

    #[test]
    fn test_summary_omits_missing_lines() {
        let registry = registry();
        let device = DeviceView::lookup(&registry, "marble").unwrap();
        let reply = summary(&device, &[(Variant::Vanilla, None), (Variant::Gms, Some(build("2.0", None)))]);

        assert_eq!(tokens(&reply), vec!["gms_marble"]);
        assert!(!reply.text.contains("Maintainer"));
        assert!(!reply.text.contains("Support Group"));
    }

    #[test]
    fn test_summary_without_builds() {
        let registry = registry();
        let device = DeviceView::lookup(&registry, "marble").unwrap();
        let reply = summary(&device, &[(Variant::Vanilla, None), (Variant::Gms, None)]);

        assert_eq!(reply, no_builds("marble"));
        assert_eq!(reply.button_count(), 0);
    }

    #[test]
    fn test_detail_view_controls() {
        let registry = registry();
        let device = DeviceView::lookup(&registry, "pipa").unwrap();
        let reply = detail(&device, Variant::Gms, &build("1.1", Some("0123456789abcdef99")));

        assert_eq!(
            tokens(&reply),
            vec!["https://example.com/1.1.zip", "md5_copy", "back_pipa"]
        );
        let rows = reply.keyboard.as_ref().unwrap().rows();
        assert_eq!(rows[1][0].text, "📋 MD5: 0123456789abcdef...");
        assert!(reply.text.starts_with("⚡ *GMS Build*"));
        assert!(reply.text.contains("🔖 Version: 1.1"));
        assert!(reply.text.contains("📅 Date: 2025-03-01 12:00:00"));
        assert!(reply.text.contains("📦 Size: 1.50 GB"));
    }

    #[test]
    fn test_detail_view_without_checksum_or_maintainer() {
        let registry = registry();
        let device = DeviceView::lookup(&registry, "marble").unwrap();
        let reply = detail(&device, Variant::Vanilla, &build("2.0", None));

        assert_eq!(tokens(&reply), vec!["https://example.com/2.0.zip", "back_marble"]);
        assert!(reply.text.contains("👤 Maintainer: Not specified"));
    }

    #[test]
    fn test_build_fields_are_escaped() {
        let registry = registry();
        let device = DeviceView::lookup(&registry, "pipa").unwrap();
        let beta = build("2.0_beta", None);

        let reply = summary(&device, &[(Variant::Vanilla, Some(beta.clone())), (Variant::Gms, None)]);
        assert!(reply.text.contains("• Vanilla: 2.0\\_beta"));

        let reply = detail(&device, Variant::Vanilla, &beta);
        assert!(reply.text.contains("🔖 Version: 2.0\\_beta"));
    }

    #[test]
    fn test_not_found_suggestions() {
        let registry = registry();
        let reply = not_found(&registry, "pip");
        assert!(reply.text.starts_with("Device \"pip\" not found"));
        assert!(reply.text.contains("• pipa (Xiaomi Pad 6)"));
        assert!(reply.text.contains("• pipa_lite (Xiaomi Pad 6 Lite)"));

        let reply = not_found(&registry, "doesnotexist");
        assert!(!reply.text.contains("Did you mean"));
    }

    #[test]
    fn test_keyboard_wire_shape() {
        let mut keyboard = Keyboard::default();
        keyboard.push(Button::callback("GMS", &CallbackAction::details(Variant::Gms, "pipa")));
        keyboard.push(Button::url("⬇️ Download", "https://example.com/a.zip"));

        let json = serde_json::to_value(&keyboard).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inline_keyboard": [
                    [{"text": "GMS", "callback_data": "gms_pipa"}],
                    [{"text": "⬇️ Download", "url": "https://example.com/a.zip"}]
                ]
            })
        );
    }

    #[test]
    fn test_device_catalog() {
        let reply = device_catalog(&registry());
        assert!(reply.text.contains("*Poco*\n• Poco F5 (`marble`)\n"));
        assert!(reply.text.contains("*Xiaomi*\n• Xiaomi Pad 6 (`pipa`)\n• Xiaomi Pad 6 Lite (`pipa_lite`)\n"));
        assert!(reply.text.find("*Poco*").unwrap() < reply.text.find("*Xiaomi*").unwrap());

        let empty = device_catalog(&Registry::default());
        assert_eq!(empty.text, "No devices found. Please try again later.");
    }
}

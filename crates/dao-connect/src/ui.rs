//! UI helper components

use alloy::primitives::Address;
use eframe::egui;

use dao_connect_core::NetworkConfig;

const ACCENT: egui::Color32 = egui::Color32::from_rgb(0, 212, 170);

/// Explorer page of an address on the network's first explorer.
pub fn explorer_address_url(network: &NetworkConfig, address: Address) -> Option<String> {
    let base = network.explorer_urls.first()?;
    Some(format!("{}/address/{address}", base.trim_end_matches('/')))
}

pub fn open_url(url: &str) {
    if let Err(e) = open::that(url) {
        tracing::warn!(url, error = %e, "could not open browser");
    }
}

/// `0x1234…abcd`
pub fn short_address(address: Address) -> String {
    let full = address.to_string();
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

/// Address rendered as a link into the block explorer when one is known.
pub fn address_link(ui: &mut egui::Ui, network: Option<&NetworkConfig>, address: Address) {
    let text = egui::RichText::new(address.to_string()).monospace();
    match network.and_then(|n| explorer_address_url(n, address)) {
        Some(url) => {
            if ui.link(text).on_hover_text("Open in block explorer").clicked() {
                open_url(&url);
            }
        }
        None => {
            ui.label(text);
        }
    }
}

/// Styled heading with accent color
pub fn styled_heading(ui: &mut egui::Ui, text: &str) {
    ui.heading(egui::RichText::new(text).color(ACCENT));
}

pub fn section_header(ui: &mut egui::Ui, text: &str) {
    ui.add_space(10.0);
    ui.label(egui::RichText::new(text).strong().size(14.0));
    ui.separator();
}

pub fn labeled_value(ui: &mut egui::Ui, label: &str, add_value: impl FnOnce(&mut egui::Ui)) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(format!("{label}:")).strong());
        add_value(ui);
    });
}

pub fn loading_spinner(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.spinner();
        ui.label(message);
    });
}

pub fn error_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("❌").size(16.0));
        ui.label(egui::RichText::new(message).color(egui::Color32::from_rgb(220, 80, 80)));
    });
}

pub fn warning_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("⚠️").size(14.0));
        ui.label(egui::RichText::new(message).color(egui::Color32::from_rgb(220, 180, 50)));
    });
}

/// Primary action button - teal/accent colored, prominent
pub fn primary_button_enabled(ui: &mut egui::Ui, text: &str, enabled: bool) -> egui::Response {
    let btn = egui::Button::new(egui::RichText::new(text).size(14.0).color(egui::Color32::WHITE))
        .min_size(egui::vec2(220.0, 40.0))
        .fill(egui::Color32::from_rgb(0, 180, 150));
    ui.add_enabled(enabled, btn)
}

pub fn secondary_button(ui: &mut egui::Ui, text: &str) -> egui::Response {
    let btn = egui::Button::new(egui::RichText::new(text).size(14.0))
        .min_size(egui::vec2(90.0, 34.0));
    ui.add(btn)
}

/// Render content in a subtle card/frame
pub fn card(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, add_contents);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(explorers: Vec<String>) -> NetworkConfig {
        let zero = Address::ZERO;
        NetworkConfig {
            chain_id: 80001,
            name: "Mumbai".to_owned(),
            disabled: false,
            rpc_urls: Vec::new(),
            explorer_urls: explorers,
            native_currency: None,
            contracts: dao_connect_core::domain::ContractAddresses {
                organization_registry: zero,
                onboarding_registry: zero,
                identity_registry: zero,
                organization_type_registry: zero,
                plugin_registry: zero,
            },
        }
    }

    #[test]
    fn explorer_url_uses_first_explorer() {
        let address = Address::repeat_byte(0xab);
        let url = explorer_address_url(
            &network(vec!["https://mumbai.polygonscan.com/".to_owned()]),
            address,
        );
        assert_eq!(
            url.map(|u| u.to_lowercase()).as_deref(),
            Some("https://mumbai.polygonscan.com/address/0xabababababababababababababababababababab")
        );
        assert_eq!(explorer_address_url(&network(Vec::new()), address), None);
    }

    #[test]
    fn short_address_keeps_both_ends() {
        assert_eq!(short_address(Address::repeat_byte(0x11)), "0x1111…1111");
    }
}

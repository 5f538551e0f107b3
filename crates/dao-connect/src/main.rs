//! DAO Connect: wallet connection gate for DAO quest links.
//!
//! Usage: `dao-connect "<deep link>"`. The link must carry
//! `organizationAddress`, `onboardingEntityAddress` and `questId`.

use eframe::egui;

use dao_connect_adapters::ConnectAdapterConfig;

mod app;
mod deeplink;
mod networks;
mod routes;
mod shim;
mod ui;
mod worker;

use deeplink::DeepLink;

type DynError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting DAO Connect");

    let config = ConnectAdapterConfig::from_env();
    let catalog = networks::load_catalog(config.networks_path.as_deref())?;
    let link = DeepLink::from_args(std::env::args()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring deep link");
        DeepLink::default()
    });

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("DAO Connect")
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([520.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "DAO Connect",
        native_options,
        Box::new(
            move |cc: &eframe::CreationContext<'_>| -> Result<Box<dyn eframe::App>, DynError> {
                let app = app::App::new(cc, link, config, catalog)?;
                Ok(Box::new(app))
            },
        ),
    )
    .map_err(|e| eyre::eyre!("ui exited with an error: {e}"))
}

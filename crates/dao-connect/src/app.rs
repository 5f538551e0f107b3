//! Main application state and update loop

use eframe::egui;

use dao_connect_adapters::ConnectAdapterConfig;
use dao_connect_core::{
    ConnectionCommand, ConnectionStatus, ConnectorKind, NetworkCatalog, NetworkConfig,
    RequiredParameters,
};

use crate::deeplink::DeepLink;
use crate::routes::{PluginDefinitionType, Route};
use crate::shim::{PresentationShim, ShimState};
use crate::ui;
use crate::worker::ConnectionWorker;

pub struct App {
    shim: PresentationShim,
    worker: ConnectionWorker,
    catalog: NetworkCatalog,
    /// Whether the connector picker is showing
    modal_open: bool,
    /// Connector of the last attempt, reused by "Try again"
    last_connector: Option<ConnectorKind>,
    task_id_input: String,
}

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        link: DeepLink,
        config: ConnectAdapterConfig,
        catalog: NetworkCatalog,
    ) -> eyre::Result<Self> {
        let shim = PresentationShim::new(cc.egui_ctx.clone(), link.route);
        let worker = ConnectionWorker::spawn(config, catalog.clone(), link.query, shim.clone())?;
        Ok(Self {
            shim,
            worker,
            catalog,
            modal_open: false,
            last_connector: None,
            task_id_input: String::new(),
        })
    }

    fn send(&self, command: ConnectionCommand) {
        if let Err(e) = self.worker.send(command) {
            tracing::error!(error = %e, "command dropped");
        }
    }

    fn connect(&mut self, params: RequiredParameters, connector: ConnectorKind) {
        self.last_connector = Some(connector);
        self.send(ConnectionCommand::Connect {
            params,
            connector,
            chain_id: None,
        });
    }

    /// Activates the connector; the worker then resumes the handshake.
    fn select(&mut self, connector: ConnectorKind) {
        self.last_connector = Some(connector);
        self.send(ConnectionCommand::SelectConnector {
            connector,
            chain_id: None,
        });
    }

    fn session_network(&self, state: &ShimState) -> Option<NetworkConfig> {
        let chain_id = state.session.as_ref()?.chain_id?;
        self.catalog.network(chain_id).ok()
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        let state = self.shim.snapshot();
        if state.is_connected() {
            self.modal_open = false;
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            self.render_header(ui, &state);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(10.0);
                match &state.route {
                    Some(route) if state.is_connected() => self.render_route(ui, &state, route),
                    _ => self.render_landing(ui, &state),
                }
                ui.add_space(20.0);
            });
        });

        if self.modal_open {
            self.render_connect_modal(ctx, &state);
        }
    }
}

impl App {
    fn render_header(&self, ui: &mut egui::Ui, state: &ShimState) {
        ui.horizontal(|ui| {
            ui.heading(
                egui::RichText::new("DAO Connect")
                    .size(22.0)
                    .color(egui::Color32::from_rgb(0, 212, 170)),
            );
            let Some(session) = state.session.as_ref().filter(|s| s.is_connected()) else {
                return;
            };
            ui.add_space(30.0);
            ui.separator();
            if let Some(account) = session.account {
                ui.label(egui::RichText::new(ui::short_address(account)).monospace());
            }
            if let Some(network) = self.session_network(state) {
                ui.label(format!("on {}", network.name));
            }
            if let Some(params) = &state.parameters {
                render_return_link(ui, params);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui::secondary_button(ui, "Disconnect").clicked() {
                    self.send(ConnectionCommand::Disconnect);
                }
            });
        });
    }

    fn render_landing(&mut self, ui: &mut egui::Ui, state: &ShimState) {
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui::styled_heading(ui, "DAO Connect");
            ui.add_space(20.0);
            ui.label(egui::RichText::new("To see the quest please connect your wallet.").strong());
            ui.add_space(20.0);

            let can_connect = state.parameters.is_some() && !state.is_busy();
            if ui::primary_button_enabled(ui, "Connect wallet", can_connect).clicked() {
                self.modal_open = true;
            }
            ui.add_space(10.0);

            if let Some(reason) = &state.validation_error {
                ui::error_message(ui, &format!("{reason}. Please check the link!"));
            }
            if let Some(notice) = &state.notice {
                ui::warning_message(ui, notice);
            }
            if !self.modal_open {
                self.render_failure(ui, state);
            }
            if let Some(params) = &state.parameters {
                ui.add_space(30.0);
                render_return_link(ui, params);
            }
        });
    }

    fn render_failure(&mut self, ui: &mut egui::Ui, state: &ShimState) {
        let Some(reason) = &state.connect_error else {
            return;
        };
        ui::error_message(ui, &reason.to_string());
        let retry = match (reason.is_transient(), self.last_connector, &state.parameters) {
            (true, Some(connector), Some(params)) => Some((params.clone(), connector)),
            _ => None,
        };
        if let Some((params, connector)) = retry {
            if ui::secondary_button(ui, "Try again").clicked() {
                self.connect(params, connector);
            }
        }
    }

    fn render_connect_modal(&mut self, ctx: &egui::Context, state: &ShimState) {
        let mut open = true;
        let mut chosen = None;
        let mut cancelled = false;

        egui::Window::new("Connect your wallet")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .open(&mut open)
            .show(ctx, |ui| {
                ui.set_min_width(300.0);
                if state.is_busy() {
                    ui::loading_spinner(ui, status_message(&state.status));
                    ui.add_space(8.0);
                    if ui::secondary_button(ui, "Cancel").clicked() {
                        cancelled = true;
                    }
                    return;
                }

                if state.connectors.is_empty() {
                    ui::error_message(ui, "No wallet connector is available.");
                }
                ui.vertical_centered(|ui| {
                    for kind in &state.connectors {
                        if ui::primary_button_enabled(ui, kind.label(), true).clicked() {
                            chosen = Some(*kind);
                        }
                        ui.add_space(6.0);
                    }
                });
                self.render_failure(ui, state);
            });

        if !open || cancelled {
            self.modal_open = false;
            self.send(ConnectionCommand::Disconnect);
            return;
        }
        if let (Some(connector), true) = (chosen, state.parameters.is_some()) {
            self.select(connector);
        }
    }

    fn render_route(&mut self, ui: &mut egui::Ui, state: &ShimState, route: &Route) {
        let network = self.session_network(state);
        match route {
            Route::Quest => self.render_quest(ui, state, network.as_ref()),
            Route::Task { plugin, task_id } => {
                ui::styled_heading(ui, plugin.title());
                ui.label(egui::RichText::new(route.path()).monospace().weak());
                ui.add_space(10.0);
                ui::card(ui, |ui| {
                    ui::labeled_value(ui, "Task", |ui| {
                        ui.label(egui::RichText::new(task_id).monospace());
                    });
                    if let Some(params) = &state.parameters {
                        ui::labeled_value(ui, "Quest", |ui| {
                            ui.label(params.quest_id());
                        });
                    }
                });
                ui.add_space(10.0);
                if ui::secondary_button(ui, "Back to quest").clicked() {
                    self.shim.navigate(Route::Quest);
                }
            }
        }
    }

    fn render_quest(
        &mut self,
        ui: &mut egui::Ui,
        state: &ShimState,
        network: Option<&NetworkConfig>,
    ) {
        let Some(params) = &state.parameters else {
            return;
        };
        ui::styled_heading(ui, &format!("Quest {}", params.quest_id()));
        ui.add_space(10.0);

        ui::card(ui, |ui| {
            ui::labeled_value(ui, "Organization", |ui| {
                ui::address_link(ui, network, params.organization_address());
            });
            ui::labeled_value(ui, "Onboarding", |ui| {
                ui::address_link(ui, network, params.onboarding_entity_address());
            });
            if let Some(account) = state.session.as_ref().and_then(|s| s.account) {
                ui::labeled_value(ui, "Account", |ui| {
                    ui::address_link(ui, network, account);
                });
            }
        });

        ui::section_header(ui, "Tasks");
        ui.horizontal(|ui| {
            ui.label("Task id:");
            ui.add(
                egui::TextEdit::singleline(&mut self.task_id_input)
                    .hint_text("1")
                    .desired_width(80.0)
                    .font(egui::TextStyle::Monospace),
            );
        });
        let task_id = self.task_id_input.trim().to_owned();
        for plugin in PluginDefinitionType::TASKS {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(plugin.title()).strong());
                let open = ui.add_enabled(!task_id.is_empty(), egui::Button::new("Open"));
                if open.clicked() {
                    self.shim.navigate(Route::Task {
                        plugin,
                        task_id: task_id.clone(),
                    });
                }
            });
        }
    }
}

fn render_return_link(ui: &mut egui::Ui, params: &RequiredParameters) {
    if let Some(url) = params.return_url() {
        let name = params.return_url_link_name().unwrap_or("Back");
        if ui.link(name).on_hover_text(url).clicked() {
            ui::open_url(url);
        }
    }
}

fn status_message(status: &ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connecting => "Waiting for your wallet...",
        ConnectionStatus::SwitchingNetwork => "Switch your wallet's network...",
        ConnectionStatus::InjectingProviderNetwork => "Adding the network to your wallet...",
        ConnectionStatus::Authorizing => "Sign the message in your wallet...",
        ConnectionStatus::InitializingBackend => "Loading the organization...",
        _ => "Loading...",
    }
}

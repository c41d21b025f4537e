//! Claim form: wallet discovery, account authorization and the claim action.

use std::sync::{Arc, Mutex};

use eframe::egui;

use airdrop_claim_adapters::{ClaimAdapterConfig, Eip1193Adapter};
use airdrop_claim_core::{ClaimReceipt, ExternalAccountAddress, PortError, SessionState, Subscription};

use crate::bridge::ClaimBridge;

type AuthorizeResult = Arc<Mutex<Option<Result<Option<ExternalAccountAddress>, PortError>>>>;
type ClaimResult = Arc<Mutex<Option<Result<ClaimReceipt, PortError>>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Idle,
    Authorizing,
    Claiming,
    Claimed(String),
    Failed(String),
}

pub struct App {
    bridge: ClaimBridge,
    api_token: String,
    status: Status,
    authorization_requested: bool,
    authorize_result: AuthorizeResult,
    claim_result: ClaimResult,
    _providers_subscription: Subscription<Eip1193Adapter>,
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ClaimAdapterConfig) -> Self {
        let bridge = ClaimBridge::new(config);

        let ctx = cc.egui_ctx.clone();
        let subscription = bridge.subscribe(move |_| ctx.request_repaint());

        let status = match bridge.start_discovery() {
            Ok(()) => Status::Idle,
            Err(e) => {
                tracing::error!(error = %e, "wallet discovery failed to start");
                Status::Failed(format!("Wallet discovery failed: {e}"))
            }
        };

        Self {
            bridge,
            api_token: String::new(),
            status,
            authorization_requested: false,
            authorize_result: Arc::new(Mutex::new(None)),
            claim_result: Arc::new(Mutex::new(None)),
            _providers_subscription: subscription,
        }
    }

    /// Requests accounts once, as soon as a provider has been selected.
    fn maybe_authorize(&mut self, ctx: &egui::Context) {
        if self.authorization_requested {
            return;
        }
        match self.bridge.sync_providers() {
            Ok(SessionState::Unauthorized { pending: false, .. }) => {}
            Ok(_) => return,
            Err(e) => {
                self.status = Status::Failed(e.to_string());
                return;
            }
        }
        self.authorization_requested = true;
        self.status = Status::Authorizing;

        let bridge = self.bridge.clone();
        let result = Arc::clone(&self.authorize_result);
        let ctx = ctx.clone();

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = bridge.authorize_async().await;
            if let Ok(mut guard) = result.lock() {
                *guard = Some(outcome);
            }
            ctx.request_repaint();
        });

        #[cfg(not(target_arch = "wasm32"))]
        std::thread::spawn(move || {
            let outcome = bridge.authorize();
            if let Ok(mut guard) = result.lock() {
                *guard = Some(outcome);
            }
            ctx.request_repaint();
        });
    }

    fn start_claim(&mut self, ctx: &egui::Context) {
        if !self.bridge.claim_enabled(&self.api_token) {
            return;
        }
        self.status = Status::Claiming;

        let bridge = self.bridge.clone();
        let api_token = self.api_token.clone();
        let result = Arc::clone(&self.claim_result);
        let ctx = ctx.clone();

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = bridge.claim_async(&api_token).await;
            if let Ok(mut guard) = result.lock() {
                *guard = Some(outcome);
            }
            ctx.request_repaint();
        });

        #[cfg(not(target_arch = "wasm32"))]
        std::thread::spawn(move || {
            let outcome = bridge.claim(&api_token);
            if let Ok(mut guard) = result.lock() {
                *guard = Some(outcome);
            }
            ctx.request_repaint();
        });
    }

    fn poll_results(&mut self) {
        let authorized = self.authorize_result.lock().ok().and_then(|mut g| g.take());
        match authorized {
            Some(Ok(Some(_))) => self.status = Status::Idle,
            Some(Ok(None)) => {
                self.status = Status::Failed("Wallet returned no accounts".to_owned())
            }
            Some(Err(e)) => self.status = Status::Failed(format!("Authorization failed: {e}")),
            None => {}
        }

        let claimed = self.claim_result.lock().ok().and_then(|mut g| g.take());
        match claimed {
            Some(Ok(receipt)) => self.status = Status::Claimed(receipt.to_hex()),
            Some(Err(e)) => self.status = Status::Failed(format!("Claim failed: {e}")),
            None => {}
        }
    }

    fn render_wallet(&self, ui: &mut egui::Ui) {
        ui.heading("Wallet");
        let providers = self.bridge.providers();
        if providers.is_empty() {
            ui.label("No wallet announced yet.");
        }
        let selected = match self.bridge.session_state() {
            Ok(SessionState::Unauthorized { provider_uuid, .. })
            | Ok(SessionState::Authorized { provider_uuid, .. }) => Some(provider_uuid),
            _ => None,
        };
        for provider in providers.iter() {
            let marker = if selected.as_deref() == Some(provider.uuid.as_str()) {
                "●"
            } else {
                "○"
            };
            ui.horizontal(|ui| {
                ui.label(marker);
                ui.strong(&provider.name);
                if !provider.rdns.is_empty() {
                    ui.weak(&provider.rdns);
                }
            });
        }

        ui.horizontal(|ui| {
            ui.label("Account:");
            match self.bridge.account() {
                Some(account) => ui.monospace(account.as_str()),
                None => ui.weak("not connected"),
            };
        });
    }

    fn render_destination(&self, ui: &mut egui::Ui) {
        ui.heading("Destination");
        let destination = self.bridge.destination();
        egui::Grid::new("destination_grid")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.label("Chain");
                ui.monospace(&destination.chain_id);
                ui.end_row();
                ui.label("Owner");
                ui.monospace(&destination.owner);
                ui.end_row();
                ui.label("Application");
                ui.monospace(self.bridge.app_id());
                ui.end_row();
                ui.label("Node service");
                ui.monospace(self.bridge.config().endpoints().http);
                ui.end_row();
            });
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        match &self.status {
            Status::Idle => {}
            Status::Authorizing => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Waiting for the wallet to share an account...");
                });
            }
            Status::Claiming => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Signing and submitting the claim...");
                });
            }
            Status::Claimed(receipt) => {
                ui.colored_label(egui::Color32::from_rgb(0x2e, 0x9e, 0x5b), "Claim submitted");
                ui.horizontal_wrapped(|ui| {
                    ui.label("Receipt:");
                    ui.monospace(receipt);
                });
            }
            Status::Failed(message) => {
                ui.colored_label(egui::Color32::from_rgb(0xd0, 0x3b, 0x3b), message);
            }
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_results();
        self.maybe_authorize(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Linera AirDrop");
            ui.separator();

            self.render_wallet(ui);
            ui.add_space(8.0);
            self.render_destination(ui);
            ui.add_space(8.0);

            ui.heading("Claim");
            ui.horizontal(|ui| {
                ui.label("API token:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.api_token)
                        .password(true)
                        .hint_text("token issued for this airdrop"),
                );
            });

            let enabled = self.bridge.claim_enabled(&self.api_token);
            if ui
                .add_enabled(enabled, egui::Button::new("Claim"))
                .clicked()
            {
                self.start_claim(ctx);
            }

            ui.add_space(8.0);
            self.render_status(ui);
        });
    }
}

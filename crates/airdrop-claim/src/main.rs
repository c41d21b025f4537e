//! AirDrop claim: connect a wallet, sign the claim envelope, submit it to the node service.

mod app;
mod bridge;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eyre::Result<()> {
    use airdrop_claim_adapters::ClaimAdapterConfig;
    use eframe::egui;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Missing URL parameters abort before any window is created.
    let config = match std::env::args().nth(1) {
        Some(url) => ClaimAdapterConfig::from_url(&url)?.with_env_overrides()?,
        None => ClaimAdapterConfig::from_env()?,
    };
    tracing::info!(chain_id = %config.chain_id, app_id = %config.app_id, "Starting AirDrop claim");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Linera AirDrop")
            .with_inner_size([640.0, 480.0])
            .with_min_inner_size([420.0, 320.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Linera AirDrop",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::App::new(cc, config)))),
    )
    .map_err(|e| eyre::eyre!("failed to run claim UI: {e}"))
}

#[cfg(target_arch = "wasm32")]
fn main() {
    tracing_wasm::set_as_global_default();

    wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = start_web().await {
            tracing::error!("AirDrop claim failed to start: {e:#}");
        }
    });
}

#[cfg(target_arch = "wasm32")]
async fn start_web() -> eyre::Result<()> {
    use airdrop_claim_adapters::ClaimAdapterConfig;
    use wasm_bindgen::JsCast;

    let window = web_sys::window().ok_or_else(|| eyre::eyre!("missing window"))?;
    let location = window.location();
    let path = location
        .pathname()
        .map_err(|e| eyre::eyre!("read location.pathname: {e:?}"))?;
    let search = location
        .search()
        .map_err(|e| eyre::eyre!("read location.search: {e:?}"))?;
    let config = ClaimAdapterConfig::from_location(&path, &search)?;
    tracing::info!(chain_id = %config.chain_id, app_id = %config.app_id, "Starting AirDrop claim");

    let canvas = window
        .document()
        .ok_or_else(|| eyre::eyre!("missing document"))?
        .get_element_by_id("the_canvas_id")
        .ok_or_else(|| eyre::eyre!("missing #the_canvas_id element"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| eyre::eyre!("#the_canvas_id is not a canvas"))?;

    eframe::WebRunner::new()
        .start(
            canvas,
            eframe::WebOptions::default(),
            Box::new(move |cc| Ok(Box::new(app::App::new(cc, config)))),
        )
        .await
        .map_err(|e| eyre::eyre!("failed to start claim UI: {e:?}"))
}

//! Area clients
//!
//! Runs the client management core against the X server on `$DISPLAY`.

mod x11_async;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{ChangeWindowAttributesAux, ConnectionExt, EventMask, MapState};
use x11rb::rust_connection::RustConnection;

use area_clients::config::Config;
use area_clients::shared::Geometry;
use area_clients::wm::WindowManager;
use area_clients::wm::events::{EventRouter, get_event_window};
use area_clients::wm::ewmh::Atoms;
use area_clients::wm::x11::X11Sink;

/// Main application state
struct ClientsApp {
    conn: Arc<RustConnection>,
    wm: WindowManager<X11Sink>,
    router: EventRouter,
    x11_stream: x11_async::X11EventStream,
}

impl ClientsApp {
    fn new() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        let screen = &conn.as_ref().setup().roots[screen_num];
        let root = screen.root;
        let screen_geometry = Geometry::new(0, 0, screen.width_in_pixels as u32, screen.height_in_pixels as u32);
        info!("Connected to X server, screen {}, root window 0x{:x}", screen_num, root);

        let config = Config::load().context("Failed to load configuration")?;

        let root_attrs = conn
            .as_ref()
            .get_window_attributes(root)?
            .reply()
            .context("Failed to get root window attributes")?;
        let required_mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE
            | EventMask::FOCUS_CHANGE;
        conn.as_ref().change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(root_attrs.your_event_mask | required_mask),
        )?
        .check()
        .context("Failed to select events on root window - is another WM running?")?;

        let atoms = Atoms::new(conn.as_ref())?;
        atoms.setup_supported(conn.as_ref(), root, "area-clients")?;
        conn.as_ref().flush()?;

        let x11_stream = x11_async::X11EventStream::new(conn.clone())?;
        let wm = WindowManager::new(X11Sink::new(conn.clone(), atoms, root), screen_geometry, &config);

        let mut app = Self {
            conn,
            wm,
            router: EventRouter::new(),
            x11_stream,
        };
        app.scan_existing_windows()?;
        Ok(app)
    }

    /// Manage windows that were mapped before we started.
    fn scan_existing_windows(&mut self) -> Result<()> {
        let root = self.wm.sink().root();
        let tree = self.conn.as_ref().query_tree(root)?.reply()?;
        info!("Scanning {} existing windows", tree.children.len());

        for &window in &tree.children {
            let Ok(attrs) = self.conn.as_ref().get_window_attributes(window)?.reply() else {
                continue;
            };
            if attrs.override_redirect || attrs.map_state != MapState::VIEWABLE {
                continue;
            }
            if let Err(e) = self.router.manage_window(&mut self.wm, window) {
                warn!("Failed to manage existing window 0x{:x}: {:#}", window, e);
            }
        }
        Ok(())
    }

    fn route(&mut self, event: &Event) {
        if let Err(e) = self.router.route_event(&mut self.wm, event) {
            warn!("Failed to handle event on {:?}: {:#}", get_event_window(event), e);
        }
    }

    async fn run(mut self) -> Result<()> {
        let mut signals = self.wm.subscribe();
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                debug!("signal {} on 0x{:x}", signal.name(), signal.window());
            }
        });

        loop {
            let batch = self.x11_stream.next_batch().await.context("X11 connection lost")?;
            for event in &batch {
                self.route(event);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Area client manager");

    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let app = ClientsApp::new()?;

    tokio::select! {
        result = app.run() => {
            if let Err(e) = result {
                error!("Application error: {:#}", e);
                return Err(e);
            }
        }
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
    }

    Ok(())
}

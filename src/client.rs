//! Wayland client glue
//!
//! Connects to the compositor, binds the three globals the program needs,
//! creates an xdg-shell top-level and translates protocol events into
//! [`SessionEvent`]s. Everything runs on one thread: the event queue hands
//! `&mut App` to each handler in turn.

use crate::buffer::{BufferError, BufferLayout};
use crate::event_loop::Dispatcher;
use crate::presenter::Presenter;
use crate::session::{Session, SessionEvent};
use crate::teardown::{self, WindowHandles};
use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use std::os::fd::BorrowedFd;
use wayland_client::{
    protocol::{
        wl_buffer::{self, WlBuffer},
        wl_callback::{self, WlCallback},
        wl_compositor::WlCompositor,
        wl_registry::{self, WlRegistry},
        wl_shm::{self, WlShm},
        wl_shm_pool::WlShmPool,
        wl_surface::WlSurface,
    },
    Connection, Dispatch, EventQueue, Proxy, QueueHandle,
};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};

pub const WINDOW_TITLE: &str = "Wayland Pepega";

const SHM_VERSION: u32 = 1;
const COMPOSITOR_VERSION: u32 = 4;
const WM_BASE_VERSION: u32 = 1;

/// [`Presenter`] backed by a `wl_shm` and the window's `wl_surface`
pub struct WaylandPresenter {
    shm: WlShm,
    surface: WlSurface,
    qh: QueueHandle<App>,
}

impl Presenter for WaylandPresenter {
    type Buffer = WlBuffer;

    fn create_buffer(
        &mut self,
        fd: BorrowedFd<'_>,
        layout: &BufferLayout,
    ) -> Result<WlBuffer, BufferError> {
        // BufferLayout guarantees every field fits in an i32
        let pool = self
            .shm
            .create_pool(fd, layout.size() as i32, &self.qh, ());
        let buffer = pool.create_buffer(
            0,
            layout.width as i32,
            layout.height as i32,
            layout.stride as i32,
            wl_shm::Format::Argb8888,
            &self.qh,
            (),
        );
        // The buffer keeps the pool's memory alive on the compositor side
        pool.destroy();
        Ok(buffer)
    }

    fn destroy_buffer(&mut self, buffer: WlBuffer) {
        buffer.destroy();
    }

    fn present(&mut self, buffer: &WlBuffer, layout: &BufferLayout) {
        self.surface.attach(Some(buffer), 0, 0);
        let (x, y, width, height) = damage_rect(layout);
        self.surface.damage_buffer(x, y, width, height);
        self.surface.commit();
    }

    fn request_frame(&mut self) {
        self.surface.frame(&self.qh, ());
    }
}

/// Whole-buffer damage in buffer coordinates
fn damage_rect(layout: &BufferLayout) -> (i32, i32, i32, i32) {
    // BufferLayout guarantees both dimensions fit in an i32
    (0, 0, layout.width as i32, layout.height as i32)
}

#[derive(Default)]
struct Globals {
    shm: Option<WlShm>,
    compositor: Option<WlCompositor>,
    wm_base: Option<XdgWmBase>,
}

impl Globals {
    fn bind(
        &mut self,
        registry: &WlRegistry,
        name: u32,
        interface: &str,
        version: u32,
        qh: &QueueHandle<App>,
    ) {
        if interface == WlShm::interface().name {
            if supports(interface, version, SHM_VERSION) {
                self.shm = Some(registry.bind(name, SHM_VERSION, qh, ()));
            }
        } else if interface == WlCompositor::interface().name {
            if supports(interface, version, COMPOSITOR_VERSION) {
                self.compositor = Some(registry.bind(name, COMPOSITOR_VERSION, qh, ()));
            }
        } else if interface == XdgWmBase::interface().name {
            if supports(interface, version, WM_BASE_VERSION) {
                self.wm_base = Some(registry.bind(name, WM_BASE_VERSION, qh, ()));
            }
        } else {
            trace!("Ignoring global {} v{}", interface, version);
        }
    }
}

fn supports(interface: &str, advertised: u32, wanted: u32) -> bool {
    if advertised < wanted {
        warn!(
            "{} is only available at v{}, need v{}",
            interface, advertised, wanted
        );
        return false;
    }
    debug!("Binding {} v{}", interface, wanted);
    true
}

/// Dispatch state shared by every protocol handler
#[derive(Default)]
pub struct App {
    globals: Globals,
    /// Size from the latest toplevel configure, applied on the surface configure
    pending_size: Option<(u32, u32)>,
    session: Option<Session<WaylandPresenter>>,
}

impl App {
    fn feed(&mut self, event: SessionEvent) -> bool {
        match self.session.as_mut() {
            Some(session) => session.handle(event),
            None => false,
        }
    }
}

/// Protocol objects released after the session, in this order
struct Window {
    toplevel: XdgToplevel,
    xdg_surface: XdgSurface,
    surface: WlSurface,
    wm_base: XdgWmBase,
    conn: Connection,
}

impl WindowHandles for Window {
    fn destroy_toplevel(&mut self) {
        self.toplevel.destroy();
    }

    fn destroy_xdg_surface(&mut self) {
        self.xdg_surface.destroy();
    }

    fn destroy_surface(&mut self) {
        self.surface.destroy();
    }

    fn disconnect(&mut self) -> Result<()> {
        self.wm_base.destroy();
        self.conn
            .flush()
            .context("Failed to flush teardown requests")
    }
}

/// A connected client with one configured-to-be top-level window
pub struct WaylandClient {
    event_queue: EventQueue<App>,
    app: App,
    _registry: WlRegistry,
    _compositor: WlCompositor,
    window: Window,
}

impl WaylandClient {
    /// Connect to the display named by the environment and map a window.
    ///
    /// The window has no content until the compositor sends its first
    /// configure.
    pub fn connect(width: u32, height: u32) -> Result<Self> {
        let conn = Connection::connect_to_env().context("Failed to connect to display")?;
        let mut event_queue = conn.new_event_queue();
        let qh = event_queue.handle();

        let registry = conn.display().get_registry(&qh, ());
        let mut app = App::default();
        event_queue
            .roundtrip(&mut app)
            .context("Registry roundtrip failed")?;

        let Globals {
            shm,
            compositor,
            wm_base,
        } = std::mem::take(&mut app.globals);
        let shm = shm.context("Compositor does not provide wl_shm")?;
        let compositor = compositor.context("Compositor does not provide wl_compositor v4")?;
        let wm_base = wm_base.context("Compositor does not provide xdg_wm_base")?;

        let surface = compositor.create_surface(&qh, ());
        let xdg_surface = wm_base.get_xdg_surface(&surface, &qh, ());
        let toplevel = xdg_surface.get_toplevel(&qh, ());
        toplevel.set_title(WINDOW_TITLE.to_string());
        surface.commit();

        let mut presenter = WaylandPresenter {
            shm,
            surface: surface.clone(),
            qh: qh.clone(),
        };
        presenter.request_frame();
        app.session = Some(Session::new(presenter, width, height));

        info!("Connected, window \"{}\" created", WINDOW_TITLE);

        Ok(Self {
            event_queue,
            app,
            _registry: registry,
            _compositor: compositor,
            window: Window {
                toplevel,
                xdg_surface,
                surface,
                wm_base,
                conn,
            },
        })
    }

    pub fn session(&self) -> Option<&Session<WaylandPresenter>> {
        self.app.session.as_ref()
    }

    /// Release everything in reverse order of acquisition and disconnect.
    ///
    /// Safe to call after the event loop failed; the buffer is destroyed
    /// either way.
    pub fn shutdown(self) -> Result<()> {
        let Self {
            event_queue,
            mut app,
            mut window,
            ..
        } = self;

        teardown::release(app.session.take(), &mut window)?;
        drop(event_queue);
        drop(window);

        info!("Disconnected from display");
        Ok(())
    }
}

impl Dispatcher for WaylandClient {
    fn dispatch_batch(&mut self) -> Result<usize> {
        Ok(self.event_queue.blocking_dispatch(&mut self.app)?)
    }

    fn is_closed(&self) -> bool {
        self.app.session.as_ref().map_or(true, Session::is_closed)
    }
}

impl Dispatch<WlRegistry, ()> for App {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => state.globals.bind(registry, name, &interface, version, qh),
            wl_registry::Event::GlobalRemove { name } => {
                trace!("Global {} removed", name);
            }
            _ => {}
        }
    }
}

impl Dispatch<WlShm, ()> for App {
    fn event(
        _: &mut Self,
        _: &WlShm,
        event: wl_shm::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_shm::Event::Format { format } = event {
            trace!("wl_shm supports {:?}", format);
        }
    }
}

impl Dispatch<XdgWmBase, ()> for App {
    fn event(
        _: &mut Self,
        wm_base: &XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<XdgSurface, ()> for App {
    fn event(
        state: &mut Self,
        xdg_surface: &XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            xdg_surface.ack_configure(serial);

            let drew = match state.pending_size.take() {
                Some((width, height)) => state.feed(SessionEvent::Resize { width, height }),
                None => false,
            };
            if !drew {
                state.feed(SessionEvent::Configure);
            }
        }
    }
}

impl Dispatch<XdgToplevel, ()> for App {
    fn event(
        state: &mut Self,
        _: &XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                trace!("Toplevel configure {}x{}", width, height);
                state.pending_size = Some((width.max(0) as u32, height.max(0) as u32));
            }
            xdg_toplevel::Event::Close => {
                state.feed(SessionEvent::Close);
            }
            _ => {}
        }
    }
}

impl Dispatch<WlCallback, ()> for App {
    fn event(
        state: &mut Self,
        _: &WlCallback,
        event: wl_callback::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            state.feed(SessionEvent::FrameDone);
        }
    }
}

impl Dispatch<WlBuffer, ()> for App {
    fn event(
        _: &mut Self,
        _: &WlBuffer,
        event: wl_buffer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            trace!("Buffer released by compositor");
        }
    }
}

wayland_client::delegate_noop!(App: ignore WlCompositor);
wayland_client::delegate_noop!(App: ignore WlShmPool);
wayland_client::delegate_noop!(App: ignore WlSurface);

//! The orchestrator that ties the layout model, the host, and command
//! sources together.
//!
//! [`DockEngine`] owns the [`Layout`] and reacts to [`Command`]s by mutating
//! it and then applying the queued [`HostRequest`]s through the
//! [`HostSurface`] trait.  Commands are handled strictly one at a time.

use crate::command::{Command, Pointer, TabIndex};
use crate::config::Config;
use crate::entity::{Entity, EntityId, TabGroup, WindowId, WindowState};
use crate::geometry::{Point, Rect};
use crate::layout::{HostRequest, Layout, LayoutError};
use crate::snap::{SnapCandidate, TabDropCandidate};
use crate::traits::{HostSurface, PreviewEvent, PreviewKind};
use log::{debug, info, warn};
use std::sync::mpsc;

/// Possible errors from the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The command was rejected by the layout model; nothing changed.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The host failed to apply a request for a window it still knows.
    #[error("host error: {0}")]
    Host(String),
}

/// What releasing the current drag would do.
#[derive(Debug, Clone)]
enum DropAction {
    Snap(SnapCandidate),
    Tab(TabDropCandidate, Point),
}

/// State of an in-flight drag.
#[derive(Debug)]
struct ActiveDrag {
    window: WindowId,
    /// Only valid candidates are kept.
    pending: Option<DropAction>,
    previewing: bool,
}

/// Applies commands to the layout model and keeps the host in sync.
///
/// The engine is generic over any [`HostSurface`] implementation, making it
/// independent of Hyprland or any other compositor.
///
/// # Typical usage
///
/// ```ignore
/// let host = HyprlandHost::new()?;
/// let mut engine = DockEngine::new(host, Config::default());
/// engine.sync_monitors()?;
/// engine.handle(Command::Undock { entity })?;
/// ```
pub struct DockEngine<H: HostSurface> {
    host: H,
    config: Config,
    layout: Layout,
    preview_tx: Option<mpsc::Sender<PreviewEvent>>,
    active_drag: Option<ActiveDrag>,
}

impl<H: HostSurface> DockEngine<H> {
    pub fn new(host: H, config: Config) -> Self {
        let layout = Layout::new(config.snap.clone(), config.tabs.clone());
        Self {
            host,
            config,
            layout,
            preview_tx: None,
            active_drag: None,
        }
    }

    /// Attach a preview event channel.
    ///
    /// The engine sends [`PreviewEvent::Show`] while a drag has a snap or
    /// tab candidate and [`PreviewEvent::Hide`] when the candidate goes away
    /// or the drag ends.
    pub fn set_preview(&mut self, tx: mpsc::Sender<PreviewEvent>) {
        self.preview_tx = Some(tx);
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Fetch the monitors from the host and validate every group against
    /// them.
    pub fn sync_monitors(&mut self) -> Result<(), EngineError> {
        let monitors = self
            .host
            .monitors()
            .map_err(|e| EngineError::Host(e.to_string()))?;
        self.layout.update_monitors(monitors);
        self.flush()
    }

    /// Handle one command, then push the resulting requests to the host.
    ///
    /// A rejected command leaves the model untouched; requests queued by
    /// earlier commands are still flushed.
    pub fn handle(&mut self, cmd: Command) -> Result<(), EngineError> {
        let result = self.dispatch(cmd);
        let flushed = self.flush();
        result?;
        flushed
    }

    fn dispatch(&mut self, cmd: Command) -> Result<(), EngineError> {
        match cmd {
            //  Host notifications
            Command::Register(spec) => {
                let features = self.config.features_for(&spec.scope());
                let mut window = spec.into_window();
                window.features = features;
                self.layout.register(window)?;
            }

            Command::Deregister { window } => {
                if self
                    .active_drag
                    .as_ref()
                    .is_some_and(|d| d.window == window)
                {
                    self.active_drag = None;
                    self.hide_preview();
                }
                self.layout.deregister(&window)?;
            }

            Command::BoundsChanged { window, bounds } => {
                self.bounds_changed(&window, bounds)?;
            }

            Command::StateChanged { window, state } => {
                self.state_changed(&window, state)?;
            }

            Command::MonitorsChanged { monitors } => {
                self.layout.update_monitors(monitors);
            }

            Command::DragUpdate {
                window,
                bounds,
                pointer,
            } => {
                self.drag_update(&window, bounds, pointer.map(|Pointer(p)| p))?;
            }

            Command::DragEnd { window } => {
                self.drag_end(&window)?;
            }

            Command::DragCancel { window } => {
                if let Some(drag) = self.active_drag.take() {
                    if drag.window != window {
                        debug!("cancel for {} while dragging {}", window, drag.window);
                    }
                }
                info!("drag of {} cancelled", window);
                self.hide_preview();
            }

            //  Layout operations
            Command::Resize { entity, bounds } => {
                let reached = self.layout.resize_entity(&entity, bounds)?;
                if reached != bounds {
                    debug!("resize of {} clamped to {:?}", entity, reached);
                }
            }

            Command::Move { entity, dx, dy } => {
                self.layout.move_entity(&entity, dx, dy)?;
            }

            Command::Dock {
                entity,
                target,
                side,
            } => {
                if !self.layout.dock(&entity, &target, side)? {
                    info!("dock of {} {} of {} did not hold", entity, side, target);
                }
            }

            Command::Undock { entity } => self.layout.undock(&entity)?,

            Command::Explode { entity } => self.layout.explode(&entity)?,

            //  Tabs
            Command::CreateTabGroup { windows } => {
                self.layout.create_tab_group(&windows)?;
            }

            Command::AddTab { group, window } => self.layout.add_tab(group, &window)?,

            Command::RemoveTab {
                group,
                window,
                drop_at,
            } => self.layout.remove_tab(group, &window, drop_at)?,

            Command::SwitchTab {
                group,
                index: TabIndex(index),
            } => self.layout.switch_tab(group, index)?,

            Command::MaximizeTabGroup { group } => self.layout.maximize_tab_group(group)?,

            Command::MinimizeTabGroup { group } => self.layout.minimize_tab_group(group)?,

            Command::RestoreTabGroup { group } => self.layout.restore_tab_group(group)?,

            Command::TabDrop {
                window,
                target,
                pointer: Pointer(p),
            } => {
                self.layout.tab_drop(&window, &target, p)?;
            }

            Command::SetTabstripHidden { group, hidden } => {
                self.layout.set_tabstrip_hidden(group, hidden)?
            }

            Command::Snapshot => match serde_json::to_string(&self.layout.snapshot()) {
                Ok(json) => info!("layout: {}", json),
                Err(e) => warn!("failed to serialize layout: {}", e),
            },
        }
        Ok(())
    }

    //  Host notifications

    /// Apply bounds the host reports.  A changed size resizes the entity
    /// through its snap group, an unchanged size moves the whole group.
    fn bounds_changed(&mut self, window: &WindowId, bounds: Rect) -> Result<(), EngineError> {
        let Some(current) = self.layout.window(window).map(|w| w.bounds) else {
            debug!("bounds of unregistered {} ignored", window);
            return Ok(());
        };
        if current == bounds {
            return Ok(());
        }
        let Some(top) = self.layout.top_level_of(window) else {
            return Ok(());
        };
        let (state, proposed) = match self.layout.entity(&top) {
            Some(Entity::Window(w)) => (w.state, bounds),
            Some(Entity::TabGroup(g)) => {
                if g.active_tab().map(|t| &t.id) != Some(window) {
                    debug!("bounds of inactive tab {} ignored", window);
                    return Ok(());
                }
                (
                    g.state,
                    TabGroup::outer_for_content(bounds, g.tabstrip().height),
                )
            }
            None => return Ok(()),
        };
        if state != WindowState::Normal {
            if matches!(top, EntityId::Window(_)) {
                self.layout.record_window_bounds(window, bounds);
            }
            debug!("{} is {:?}, bounds recorded only", window, state);
            return Ok(());
        }

        if (current.width, current.height) == (bounds.width, bounds.height) {
            self.layout
                .move_entity(&top, bounds.x - current.x, bounds.y - current.y)?;
        } else {
            self.layout.resize_entity(&top, proposed)?;
        }

        // The host already shows `bounds`; pull it back when the model
        // clamped the change.
        let reached = self.layout.window(window).map(|w| w.bounds);
        if let Some(reached) = reached.filter(|r| *r != bounds) {
            debug!("{} clamped to {:?}, correcting host", window, reached);
            self.layout.push_request(HostRequest::SetBounds {
                window: window.clone(),
                bounds: reached,
            });
        }
        Ok(())
    }

    fn state_changed(&mut self, window: &WindowId, state: WindowState) -> Result<(), EngineError> {
        if !self.layout.is_registered(window) {
            debug!("state of unregistered {} ignored", window);
            return Ok(());
        }
        let Some(group) = self.layout.tab_group_of(window) else {
            self.layout.record_window_state(window, state)?;
            return Ok(());
        };
        match state {
            WindowState::Maximized => self.layout.maximize_tab_group(group)?,
            WindowState::Minimized => self.layout.minimize_tab_group(group)?,
            WindowState::Normal => {
                let current = self.layout.tab_group(group).map(|g| g.state);
                if current != Some(WindowState::Normal) {
                    self.layout.restore_tab_group(group)?;
                }
            }
        }
        Ok(())
    }

    //  Drag

    /// Move the dragged group rigidly and refresh the drop candidate.
    fn drag_update(
        &mut self,
        window: &WindowId,
        bounds: Rect,
        pointer: Option<Point>,
    ) -> Result<(), EngineError> {
        let current = self
            .layout
            .window(window)
            .map(|w| w.bounds)
            .ok_or_else(|| LayoutError::UnknownWindow(window.clone()))?;
        let top = self
            .layout
            .top_level_of(window)
            .ok_or_else(|| LayoutError::UnknownWindow(window.clone()))?;
        let state = self.layout.entity(&top).map(Entity::state);
        if state != Some(WindowState::Normal) {
            debug!("drag of {} ignored while {:?}", window, state);
            return Ok(());
        }

        let restart = self
            .active_drag
            .as_ref()
            .is_some_and(|d| &d.window != window);
        if restart || self.active_drag.is_none() {
            debug!("drag of {} started", window);
            self.active_drag = Some(ActiveDrag {
                window: window.clone(),
                pending: None,
                previewing: false,
            });
        }

        self.layout
            .move_entity(&top, bounds.x - current.x, bounds.y - current.y)?;

        let tab = pointer.and_then(|p| {
            self.layout
                .detect_tab_drop(window, p)
                .map(|candidate| (candidate, p))
        });
        let (preview, pending) = match tab {
            Some((candidate, p)) => (
                Some((PreviewKind::Tab, candidate.region, candidate.valid)),
                candidate
                    .valid
                    .then(|| DropAction::Tab(candidate.clone(), p)),
            ),
            None => match self.layout.detect_snap(&top) {
                Some(candidate) => (
                    Some((PreviewKind::Snap, candidate.preview, candidate.valid)),
                    candidate.valid.then(|| DropAction::Snap(candidate.clone())),
                ),
                None => (None, None),
            },
        };

        match preview {
            Some((kind, bounds, valid)) => self.show_preview(kind, bounds, valid),
            None => {
                if self.active_drag.as_ref().is_some_and(|d| d.previewing) {
                    self.hide_preview();
                }
            }
        }
        if let Some(drag) = self.active_drag.as_mut() {
            drag.pending = pending;
            drag.previewing = preview.is_some();
        }
        Ok(())
    }

    /// Apply the pending candidate of the drag, if any.
    fn drag_end(&mut self, window: &WindowId) -> Result<(), EngineError> {
        let drag = self.active_drag.take();
        self.hide_preview();
        let Some(drag) = drag else {
            debug!("drag end for {} without a drag", window);
            return Ok(());
        };
        if &drag.window != window {
            debug!("drag end for {} while dragging {}", window, drag.window);
            return Ok(());
        }
        match drag.pending {
            Some(DropAction::Snap(candidate)) => {
                if !self.layout.apply_snap(&candidate)? {
                    info!("snap of {} onto {} did not hold", candidate.source, candidate.target);
                }
            }
            Some(DropAction::Tab(candidate, pointer)) => {
                self.layout
                    .tab_drop(&candidate.window, &candidate.target, pointer)?;
            }
            None => debug!("drag of {} ended without a candidate", window),
        }
        Ok(())
    }

    //  Preview helpers

    fn show_preview(&self, kind: PreviewKind, bounds: Rect, valid: bool) {
        if let Some(tx) = &self.preview_tx {
            let _ = tx.send(PreviewEvent::Show {
                kind,
                bounds,
                valid,
            });
        }
    }

    fn hide_preview(&self) {
        if let Some(tx) = &self.preview_tx {
            let _ = tx.send(PreviewEvent::Hide);
        }
    }

    //  Host requests

    /// Apply every queued request.  Requests for windows that closed in
    /// the meantime are dropped, and a failure on a window the host no
    /// longer knows is a desync that is discarded.  The first real failure
    /// is returned after the remaining requests were tried.
    fn flush(&mut self) -> Result<(), EngineError> {
        let mut first_error = None;
        for request in self.layout.take_requests() {
            let window = request.window().clone();
            if !self.layout.is_registered(&window) {
                debug!("dropping {:?}: {} is gone", request, window);
                continue;
            }
            let result = match &request {
                HostRequest::SetBounds { window, bounds } => self.host.set_bounds(window, *bounds),
                HostRequest::SetState { window, state } => self.host.set_state(window, *state),
                HostRequest::SetVisible { window, visible } => {
                    self.host.set_visible(window, *visible)
                }
            };
            let Err(e) = result else {
                continue;
            };
            match self.host.bounds(&window) {
                Ok(None) => debug!("host lost {}, discarding {:?}", window, request),
                _ => {
                    warn!("failed to apply {:?}: {}", request, e);
                    first_error.get_or_insert(EngineError::Host(e.to_string()));
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

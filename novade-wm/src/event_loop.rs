//! The `calloop` event loop that drives a [`Compositor`].
//!
//! Sources: the backend channel, a SIGCHLD self-pipe for reaping spawned helpers,
//! a SIGTERM/SIGINT self-pipe for orderly exit, one timer per activation token, and
//! a ping that wakes the loop when a refresh left work behind. The refresh pass
//! runs after every dispatch, right before the loop blocks again.

use calloop::channel::{self, Event as ChannelEvent};
use calloop::generic::Generic;
use calloop::ping::{make_ping, Ping};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, Interest, LoopHandle, Mode, PostAction};
use nix::sys::signal::Signal;
use tracing::{debug, error, info, trace, warn};

use crate::backend::{Backend, BackendEvent, BackendRequest};
use crate::compositor::Compositor;
use crate::diagnostics::DiagnosticSource;
use crate::error::StartupError;
use crate::process::SignalPipe;

fn loop_error(err: impl std::fmt::Display) -> StartupError {
    StartupError::EventLoop(err.to_string())
}

/// Runs until the backend closes or a termination signal arrives, then shuts the
/// compositor down.
pub fn run(compositor: &mut Compositor, backend: &mut dyn Backend) -> Result<(), StartupError> {
    let mut event_loop: EventLoop<Compositor> = EventLoop::try_new().map_err(loop_error)?;
    let handle = event_loop.handle();
    let signal = event_loop.get_signal();

    let (sender, events) = channel::channel::<BackendEvent>();
    let outputs = backend.init(sender)?;
    info!(backend = backend.name(), outputs = outputs.len(), "backend initialized");
    compositor.add_initial_outputs(outputs)?;

    handle
        .insert_source(events, |event, _, compositor| match event {
            ChannelEvent::Msg(event) => compositor.handle_backend_event(event),
            ChannelEvent::Closed => {
                info!("backend channel closed");
                compositor.request_quit();
            }
        })
        .map_err(|e| loop_error(e.error))?;

    let children = SignalPipe::new(&[Signal::SIGCHLD as i32])?;
    handle
        .insert_source(Generic::new(children, Interest::READ, Mode::Level), |_, pipe, compositor| {
            // SAFETY: the pipe is only drained, never closed or replaced.
            let pipe = unsafe { pipe.get_mut() };
            if pipe.drain()? {
                for child in compositor.reap_children() {
                    trace!(pid = child.pid, "child exited");
                }
            }
            Ok(PostAction::Continue)
        })
        .map_err(|e| loop_error(e.error))?;

    let termination = SignalPipe::new(&[Signal::SIGTERM as i32, Signal::SIGINT as i32])?;
    handle
        .insert_source(Generic::new(termination, Interest::READ, Mode::Level), |_, pipe, compositor| {
            // SAFETY: as above.
            let pipe = unsafe { pipe.get_mut() };
            if pipe.drain()? {
                info!("termination signal received");
                compositor.request_quit();
            }
            Ok(PostAction::Continue)
        })
        .map_err(|e| loop_error(e.error))?;

    let (ping, ping_source) = make_ping().map_err(loop_error)?;
    handle
        .insert_source(ping_source, |_, _, _| trace!("refresh wake-up"))
        .map_err(|e| loop_error(e.error))?;

    after_dispatch(compositor, backend, &handle, &ping);
    let result = event_loop.run(None, compositor, |compositor| {
        after_dispatch(compositor, backend, &handle, &ping);
        if compositor.quit_requested() {
            signal.stop();
        }
    });

    compositor.shutdown();
    result.map_err(loop_error)
}

/// Refresh, forward backend requests and arm activation timers.
fn after_dispatch(
    compositor: &mut Compositor,
    backend: &mut dyn Backend,
    handle: &LoopHandle<'_, Compositor>,
    ping: &Ping,
) {
    if compositor.quit_requested() {
        return;
    }
    compositor.refresh();
    if compositor.needs_refresh() {
        ping.ping();
    }

    for request in compositor.take_backend_requests() {
        match request {
            BackendRequest::SwitchVt(vt) => {
                if let Err(err) = backend.switch_vt(vt) {
                    warn!(vt, %err, "virtual terminal switch failed");
                    compositor
                        .diagnostics
                        .record(DiagnosticSource::Backend, err.to_string());
                }
            }
        }
    }

    let timeout = compositor.activation_tokens().timeout();
    for token in compositor.activation_tokens_mut().take_unscheduled() {
        debug!(%token, ?timeout, "arming activation token expiry");
        let timer = Timer::from_duration(timeout);
        let armed = handle.insert_source(timer, move |_, _, compositor| {
            compositor.activation_tokens_mut().expire(&token);
            TimeoutAction::Drop
        });
        if let Err(err) = armed {
            error!(error = %err.error, "cannot arm activation timer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessSurface;
    use crate::error::BackendError;
    use crate::output::OutputDescriptor;
    use crate::policy::NoopPolicy;
    use crate::protocol::SurfaceKey;
    use crate::backend::SurfaceEvent;
    use calloop::channel::Sender;
    use novade_core::config::WmConfig;
    use novade_core::types::Size;

    /// Delivers a scripted batch of events during `init`, then hangs up.
    struct Scripted {
        events: Vec<BackendEvent>,
    }

    impl Backend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn init(&mut self, events: Sender<BackendEvent>) -> Result<Vec<OutputDescriptor>, BackendError> {
            for event in self.events.drain(..) {
                events.send(event).map_err(|_| BackendError::ChannelClosed)?;
            }
            Ok(vec![OutputDescriptor::new("HEADLESS-1", Size::new(1280, 720))])
        }

        fn switch_vt(&mut self, _vt: u32) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn compositor() -> Compositor {
        Compositor::new(WmConfig::default(), Box::new(NoopPolicy)).unwrap()
    }

    #[test]
    fn test_run_stops_when_backend_hangs_up() {
        let surface = HeadlessSurface::new("term");
        let probe = surface.probe();
        let key = SurfaceKey(1);
        let mut backend = Scripted {
            events: vec![
                BackendEvent::NewToplevel {
                    key,
                    surface: Box::new(surface),
                },
                BackendEvent::Surface {
                    key,
                    event: SurfaceEvent::Commit(Size::default()),
                },
                BackendEvent::Surface {
                    key,
                    event: SurfaceEvent::Map,
                },
            ],
        };

        let mut c = compositor();
        run(&mut c, &mut backend).unwrap();

        assert!(c.quit_requested());
        assert_eq!(c.window_count(), 0);
        assert!(c.outputs().is_empty());
        assert!(!probe.log().configures.is_empty());
    }

    #[test]
    fn test_backend_without_outputs_is_fatal() {
        struct Empty;
        impl Backend for Empty {
            fn name(&self) -> &str {
                "empty"
            }
            fn init(&mut self, _: Sender<BackendEvent>) -> Result<Vec<OutputDescriptor>, BackendError> {
                Ok(Vec::new())
            }
            fn switch_vt(&mut self, _: u32) -> Result<(), BackendError> {
                Ok(())
            }
        }

        let mut c = compositor();
        assert!(run(&mut c, &mut Empty).is_err());
    }
}

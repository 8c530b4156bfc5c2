// Play/stop state machine for the per-frame callback chain.
//
// Every scheduled frame gets a handle. A frame only runs if its handle is
// still the pending one, so stop() can cancel a frame that has already been
// requested from the windowing system.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle(u64);

#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    pending: Option<FrameHandle>,
    next_id: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self { state: LoopState::Stopped, pending: None, next_id: 0 }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == LoopState::Playing
    }

    /// Enter Playing. Returns false if already playing.
    pub fn play(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.state = LoopState::Playing;
        true
    }

    /// Enter Stopped and cancel the pending frame, if any.
    pub fn stop(&mut self) -> Option<FrameHandle> {
        self.state = LoopState::Stopped;
        self.pending.take()
    }

    /// Request the next frame. Replaces any pending request, so repeated
    /// calls between frames still yield a single frame.
    pub fn schedule(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending = Some(handle);
        handle
    }

    /// Consume the pending request when the display is ready for a frame.
    /// Returns false if nothing is pending (never scheduled, or cancelled).
    pub fn begin_frame(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_loop_is_stopped_and_idle() {
        let mut frame_loop = FrameLoop::new();
        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert!(!frame_loop.begin_frame());
    }

    #[test]
    fn test_scheduled_frame_runs_once() {
        let mut frame_loop = FrameLoop::new();
        frame_loop.play();
        frame_loop.schedule();
        frame_loop.schedule();
        assert!(frame_loop.begin_frame());
        assert!(!frame_loop.begin_frame());
    }

    #[test]
    fn test_stop_cancels_pending_frame() {
        let mut frame_loop = FrameLoop::new();
        frame_loop.play();
        let handle = frame_loop.schedule();
        assert_eq!(frame_loop.stop(), Some(handle));
        assert!(!frame_loop.is_playing());
        assert!(!frame_loop.begin_frame());
    }

    #[test]
    fn test_play_is_idempotent() {
        let mut frame_loop = FrameLoop::new();
        assert!(frame_loop.play());
        assert!(!frame_loop.play());
        frame_loop.stop();
        assert!(frame_loop.play());
    }

    #[test]
    fn test_handles_are_unique() {
        let mut frame_loop = FrameLoop::new();
        let a = frame_loop.schedule();
        let b = frame_loop.schedule();
        assert_ne!(a, b);
        assert_eq!(frame_loop.stop(), Some(b));
    }
}

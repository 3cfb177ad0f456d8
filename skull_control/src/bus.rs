//! Command bus and status board.
//!
//! The only coupling between the motion engine, the protocol decoder and
//! front-ends. Both halves are plain shared objects handed to each component
//! at construction; nothing here is global.
//!
//! - [`CommandBus`]: bounded many-producer / single-consumer FIFO of
//!   [`MotionCommand`]s plus the id and timestamp source.
//! - [`StatusBoard`]: the [`SystemStatus`](skull_common::control::status::SystemStatus)
//!   record, copied in and out under a short bounded-wait lock.

mod queue;
mod status;

pub use queue::CommandQueue;
pub use status::StatusBoard;

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use skull_common::control::command::{CommandKind, MotionCommand};
use skull_common::control::motion::ProfileOverride;

/// Command queue plus the stamping clock shared by all producers.
#[derive(Debug)]
pub struct CommandBus {
    queue: CommandQueue,
    next_id: AtomicU32,
    epoch: Instant,
}

impl CommandBus {
    /// Creates a bus whose queue accepts at most `capacity` pending commands.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: CommandQueue::new(capacity),
            next_id: AtomicU32::new(1),
            epoch: Instant::now(),
        }
    }

    /// Milliseconds since the bus was created.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Stamps a new command with the next id and the current time.
    pub fn command(&self, kind: CommandKind) -> MotionCommand {
        self.command_with(kind, ProfileOverride::NONE)
    }

    /// Like [`command`](Self::command) with a speed/acceleration override.
    pub fn command_with(&self, kind: CommandKind, profile: ProfileOverride) -> MotionCommand {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        MotionCommand::new(id, self.now_ms(), kind, profile)
    }

    /// Non-blocking enqueue. `false` means the command was dropped.
    #[inline]
    pub fn submit(&self, cmd: MotionCommand) -> bool {
        self.queue.push(cmd)
    }

    /// Stamps and submits in one call.
    pub fn send(&self, kind: CommandKind) -> bool {
        self.submit(self.command(kind))
    }

    /// Dequeues the oldest command. Consumer side only.
    #[inline]
    pub fn pop(&self) -> Option<MotionCommand> {
        self.queue.pop()
    }

    #[inline]
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }
}

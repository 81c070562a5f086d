//! FIFO matching of emulator replies with the commands that requested them.

use crate::debugger::error::{Error, ProtocolError};
use crate::emulator::command::Command;
use crate::emulator::framer::Tokens;
use crate::emulator::WIRE_TARGET;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;

/// Code executed when the reply to a command arrives.
/// Context `C` is passed explicitly instead of being captured.
pub type Continuation<C> = Box<dyn FnOnce(&C, Tokens) -> Result<(), Error> + Send>;

struct Pending<C> {
    verb: &'static str,
    continuation: Option<Continuation<C>>,
}

struct Inner<C> {
    pending: VecDeque<Pending<C>>,
    writer: Option<Box<dyn Write + Send>>,
}

/// Command/reply correlator.
///
/// Every command sent occupies exactly one slot in the queue, even if it has no continuation,
/// because the emulator answers every command with exactly one reply line.
pub struct Correlator<C> {
    inner: Mutex<Inner<C>>,
}

impl<C> Correlator<C> {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                writer: Some(Box::new(writer)),
            }),
        }
    }

    /// Enqueue continuation and write command into emulator input.
    /// Both happen under the same lock, so concurrent senders can't reorder the queue.
    pub fn send(&self, cmd: &Command, continuation: Option<Continuation<C>>) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        let Inner { pending, writer } = &mut *inner;
        let writer = writer.as_mut().ok_or(Error::Disconnected)?;

        log::trace!(target: WIRE_TARGET, "SEND: {cmd}");
        pending.push_back(Pending {
            verb: cmd.verb(),
            continuation,
        });

        let written = writeln!(writer, "{cmd}").and_then(|_| writer.flush());
        if let Err(e) = written {
            pending.pop_back();
            return Err(e.into());
        }
        Ok(())
    }

    /// Match reply with the oldest pending command and run its continuation.
    /// Continuation is called after the queue lock is released, so it may send new commands.
    pub fn complete(&self, ctx: &C, reply: Tokens) -> Result<(), Error> {
        let pending = self.inner.lock().unwrap().pending.pop_front();
        let Some(pending) = pending else {
            return Err(ProtocolError::UnexpectedReply(reply.join(" ")).into());
        };

        match pending.continuation {
            None => {
                log::debug!(target: WIRE_TARGET, "reply to `{}` ignored", pending.verb);
                Ok(())
            }
            Some(continuation) => continuation(ctx, reply),
        }
    }

    /// Close emulator input and drop all pending continuations without calling them.
    /// Return a number of abandoned commands.
    pub fn close(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.writer = None;
        let abandoned = inner.pending.len();
        inner.pending.clear();
        abandoned
    }

    /// Return true if commands can be sent.
    pub fn is_open(&self) -> bool {
        self.inner.lock().unwrap().writer.is_some()
    }

    /// Number of commands waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer that keeps everything written into a shared buffer.
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(ToOwned::to_owned)
                .collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Writer that fails every write.
    pub struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    fn record(tag: &'static str) -> Continuation<Log> {
        Box::new(move |log: &Log, reply: Tokens| {
            log.0
                .lock()
                .unwrap()
                .push(format!("{tag}: {}", reply.join(" ")));
            Ok(())
        })
    }

    fn reply(s: &str) -> Tokens {
        s.split_whitespace().map(ToOwned::to_owned).collect()
    }

    #[test]
    fn test_fifo_order() {
        let buf = SharedBuf::default();
        let correlator = Correlator::<Log>::new(buf.clone());
        let log = Log::default();

        correlator.send(&Command::Suspend, Some(record("a"))).unwrap();
        correlator.send(&Command::StepInto, Some(record("b"))).unwrap();
        correlator.send(&Command::Resume, None).unwrap();
        correlator
            .send(
                &Command::ReadMemory {
                    start: 16,
                    length: 1,
                },
                Some(record("c")),
            )
            .unwrap();
        assert_eq!(correlator.in_flight(), 4);
        assert_eq!(
            buf.lines(),
            vec!["suspend", "step-into", "resume", "read-memory 16 1"]
        );

        correlator.complete(&log, reply("main.asm 1")).unwrap();
        correlator.complete(&log, reply("main.asm 2")).unwrap();
        correlator.complete(&log, reply("ok")).unwrap();
        correlator.complete(&log, reply("ff")).unwrap();

        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["a: main.asm 1", "b: main.asm 2", "c: ff"]
        );
        assert_eq!(correlator.in_flight(), 0);
    }

    #[test]
    fn test_fifo_order_with_concurrent_senders() {
        const SENDERS: u64 = 8;
        const COMMANDS_PER_SENDER: u64 = 50;

        let buf = SharedBuf::default();
        let correlator = Arc::new(Correlator::<Log>::new(buf.clone()));

        let handles: Vec<_> = (0..SENDERS)
            .map(|sender| {
                let correlator = correlator.clone();
                std::thread::spawn(move || {
                    for i in 0..COMMANDS_PER_SENDER {
                        let start = sender * 1000 + i;
                        let continuation: Continuation<Log> =
                            Box::new(move |log: &Log, reply: Tokens| {
                                log.0
                                    .lock()
                                    .unwrap()
                                    .push(format!("{start}: {}", reply.join(" ")));
                                Ok(())
                            });
                        correlator
                            .send(&Command::ReadMemory { start, length: 1 }, Some(continuation))
                            .unwrap();
                    }
                })
            })
            .collect();
        handles.into_iter().for_each(|h| h.join().unwrap());

        let wire = buf.lines();
        assert_eq!(wire.len() as u64, SENDERS * COMMANDS_PER_SENDER);
        assert_eq!(correlator.in_flight(), wire.len());

        // emulator answers each command with its own start address
        let log = Log::default();
        for line in &wire {
            let start = line.split_whitespace().nth(1).unwrap();
            correlator.complete(&log, reply(start)).unwrap();
        }

        let log = log.0.into_inner().unwrap();
        assert_eq!(log.len(), wire.len());
        for entry in log {
            let (tag, answer) = entry.split_once(": ").unwrap();
            assert_eq!(tag, answer);
        }
        assert_eq!(correlator.in_flight(), 0);
    }

    #[test]
    fn test_reply_without_command() {
        let correlator = Correlator::<Log>::new(SharedBuf::default());
        let err = correlator.complete(&Log::default(), reply("stray")).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnexpectedReply(ref r)) if r == "stray"
        ));
    }

    #[test]
    fn test_continuation_can_send() {
        let buf = SharedBuf::default();
        let correlator = Arc::new(Correlator::<Log>::new(buf.clone()));
        let log = Log::default();

        let inner = correlator.clone();
        correlator
            .send(
                &Command::Suspend,
                Some(Box::new(move |_: &Log, _: Tokens| {
                    inner.send(&Command::StepInto, None)?;
                    Ok(())
                })),
            )
            .unwrap();
        correlator.complete(&log, reply("main.asm 3")).unwrap();

        assert_eq!(buf.lines(), vec!["suspend", "step-into"]);
        assert_eq!(correlator.in_flight(), 1);
    }

    #[test]
    fn test_close_abandons_pending() {
        let correlator = Correlator::<Log>::new(SharedBuf::default());
        let log = Log::default();
        correlator.send(&Command::Suspend, Some(record("a"))).unwrap();
        correlator.send(&Command::StepInto, Some(record("b"))).unwrap();

        assert_eq!(correlator.close(), 2);
        assert!(!correlator.is_open());
        assert!(matches!(
            correlator.send(&Command::Resume, None),
            Err(Error::Disconnected)
        ));
        assert!(correlator.complete(&log, reply("main.asm 1")).is_err());
        assert!(log.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_write_failure_keeps_queue_consistent() {
        let correlator = Correlator::<Log>::new(BrokenPipe);
        assert!(matches!(
            correlator.send(&Command::Suspend, Some(record("a"))),
            Err(Error::IO(_))
        ));
        assert_eq!(correlator.in_flight(), 0);
    }
}

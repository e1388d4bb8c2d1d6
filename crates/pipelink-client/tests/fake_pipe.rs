//! Scripted in-memory transport shared by engine tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use pipelink_client::transport::{PipeTransport, ReadOutcome};
use pipelink_core::error::{PipeLinkError, Result};
use pipelink_core::protocol::{Frame, Opcode};

enum Script {
    Frame(Frame),
    Broken,
}

#[derive(Default)]
struct PipeState {
    refuse_connects: u32,
    connected: bool,
    connects: u32,
    auto_ready: bool,
    close_after_ready: bool,
    fail_writes: bool,
    read_delay: Option<Duration>,
    inbound: VecDeque<Script>,
    writes: Vec<Frame>,
}

/// Test-side handle to the fake pipe.
#[derive(Clone, Default)]
pub struct Pipe {
    state: Arc<Mutex<PipeState>>,
}

impl Pipe {
    /// A pipe that accepts connects and answers the handshake with Ready.
    pub fn answering() -> Self {
        let pipe = Pipe::default();
        pipe.state.lock().unwrap().auto_ready = true;
        pipe
    }

    /// Answers every handshake with Ready and then immediately closes.
    pub fn flapping() -> Self {
        let pipe = Pipe::answering();
        pipe.state.lock().unwrap().close_after_ready = true;
        pipe
    }

    pub fn transport(&self) -> FakeTransport {
        FakeTransport { pipe: self.clone() }
    }

    pub fn refuse_connects(&self, n: u32) {
        self.state.lock().unwrap().refuse_connects = n;
    }

    /// Every write fails with a closed pipe while set.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// How long an empty read waits before reporting `WouldBlock`.
    pub fn read_delay(&self, delay: Duration) {
        self.state.lock().unwrap().read_delay = Some(delay);
    }

    pub fn push_frame(&self, frame: Frame) {
        self.state.lock().unwrap().inbound.push_back(Script::Frame(frame));
    }

    pub fn push_json(&self, value: Value) {
        self.push_frame(Frame::json(Opcode::Frame, &value).unwrap());
    }

    pub fn break_pipe(&self) {
        self.state.lock().unwrap().inbound.push_back(Script::Broken);
    }

    pub fn connects(&self) -> u32 {
        self.state.lock().unwrap().connects
    }

    pub fn writes(&self) -> Vec<Frame> {
        self.state.lock().unwrap().writes.clone()
    }

    /// JSON bodies of every `Frame`-opcode write, in order.
    pub fn sent_commands(&self) -> Vec<Value> {
        self.writes()
            .iter()
            .filter(|f| f.opcode == Opcode::Frame)
            .map(|f| f.parse::<Value>().unwrap())
            .collect()
    }
}

pub fn ready_frame() -> Frame {
    Frame::json(
        Opcode::Frame,
        &json!({
            "cmd": "DISPATCH",
            "evt": "READY",
            "nonce": null,
            "data": {
                "v": 1,
                "config": {
                    "cdn_host": "cdn.discordapp.com",
                    "api_endpoint": "//discord.com/api",
                    "environment": "production"
                },
                "user": { "id": "53908232506183680", "username": "Mason", "global_name": "Mason" }
            }
        }),
    )
    .unwrap()
}

pub struct FakeTransport {
    pipe: Pipe,
}

#[async_trait]
impl PipeTransport for FakeTransport {
    async fn connect(&mut self, _slot: u8) -> bool {
        let mut s = self.pipe.state.lock().unwrap();
        if s.refuse_connects > 0 {
            s.refuse_connects -= 1;
            return false;
        }
        s.connected = true;
        s.connects += 1;
        true
    }

    async fn close(&mut self) {
        let mut s = self.pipe.state.lock().unwrap();
        s.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.pipe.state.lock().unwrap().connected
    }

    async fn read_frame(&mut self) -> Result<ReadOutcome> {
        let (next, delay) = {
            let mut s = self.pipe.state.lock().unwrap();
            if !s.connected {
                return Err(PipeLinkError::NotConnected);
            }
            (s.inbound.pop_front(), s.read_delay)
        };
        match next {
            Some(Script::Frame(frame)) => Ok(ReadOutcome::Frame(frame)),
            Some(Script::Broken) => Err(PipeLinkError::ConnectionClosed),
            None => {
                tokio::time::sleep(delay.unwrap_or(Duration::from_millis(2))).await;
                Ok(ReadOutcome::WouldBlock)
            }
        }
    }

    async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mut s = self.pipe.state.lock().unwrap();
        if !s.connected {
            return Err(PipeLinkError::NotConnected);
        }
        if s.fail_writes {
            return Err(PipeLinkError::ConnectionClosed);
        }
        s.writes.push(frame.clone());
        if frame.opcode == Opcode::Handshake && s.auto_ready {
            s.inbound.push_back(Script::Frame(ready_frame()));
            if s.close_after_ready {
                let close = Frame::json(Opcode::Close, &json!({ "code": 1000, "message": "bye" })).unwrap();
                s.inbound.push_back(Script::Frame(close));
            }
        }
        Ok(())
    }
}

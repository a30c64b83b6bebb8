#![allow(dead_code)]

//! Hand-written doubles for the host event loop and the native libraries.
//!
//! Every double shares its state through an `Rc<RefCell<..>>` handle so a test
//! can keep observing it after the double moved into the component under test.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use netglue::network::mqtt::{self, Backend, Event, Library, MessageId, QoS, Will};
use netglue::network::notifier::PollEvent;
use netglue::network::transfer::{
    ActionTarget, Done, Easy, Multi, MultiError, MultiHooks, Token, TransferCode, XferInfo,
};
use netglue::network::{Descriptor, Direction, Error, EventLoop, Timer, TimerMode};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Event loop

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimerState {
    pub running: Option<(Duration, TimerMode)>,
    pub starts: usize,
    pub stops: usize,
}

#[derive(Debug, Default)]
pub struct LoopState {
    pub watchers: Vec<(Descriptor, Direction)>,
    pub watch_calls: usize,
    pub refuse: bool,
    pub timers: Vec<Rc<RefCell<TimerState>>>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeLoop {
    pub state: Rc<RefCell<LoopState>>,
}

impl FakeLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watcher_count(&self, fd: Descriptor, direction: Direction) -> usize {
        self.state
            .borrow()
            .watchers
            .iter()
            .filter(|w| **w == (fd, direction))
            .count()
    }

    pub fn live_watchers(&self) -> usize {
        self.state.borrow().watchers.len()
    }

    pub fn watch_calls(&self) -> usize {
        self.state.borrow().watch_calls
    }

    pub fn timer_state(&self, index: usize) -> TimerState {
        self.state.borrow().timers[index].borrow().clone()
    }

    pub fn refuse_watches(&self, refuse: bool) {
        self.state.borrow_mut().refuse = refuse;
    }
}

#[derive(Debug)]
pub struct FakeWatcher {
    fd: Descriptor,
    direction: Direction,
    state: Rc<RefCell<LoopState>>,
}

impl Drop for FakeWatcher {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        if let Some(index) = state
            .watchers
            .iter()
            .position(|w| *w == (self.fd, self.direction))
        {
            state.watchers.remove(index);
        }
    }
}

#[derive(Debug)]
pub struct FakeTimer {
    state: Rc<RefCell<TimerState>>,
}

impl Timer for FakeTimer {
    fn start(&mut self, interval: Duration, mode: TimerMode) {
        let mut state = self.state.borrow_mut();
        state.starts += 1;
        state.running = Some((interval, mode));
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.stops += 1;
        state.running = None;
    }

    fn is_running(&self) -> bool {
        self.state.borrow().running.is_some()
    }
}

impl EventLoop for FakeLoop {
    type Watcher = FakeWatcher;
    type Timer = FakeTimer;

    fn watch(&mut self, fd: Descriptor, direction: Direction) -> Result<FakeWatcher, Error> {
        let mut state = self.state.borrow_mut();
        state.watch_calls += 1;
        if state.refuse {
            return Err(Error::WatchRefused);
        }
        if fd < 0 {
            return Err(Error::InvalidDescriptor);
        }
        state.watchers.push((fd, direction));
        Ok(FakeWatcher {
            fd,
            direction,
            state: Rc::clone(&self.state),
        })
    }

    fn timer(&mut self) -> FakeTimer {
        let timer = Rc::new(RefCell::new(TimerState::default()));
        self.state.borrow_mut().timers.push(Rc::clone(&timer));
        FakeTimer { state: timer }
    }
}

// Multi-transfer library

/// A callback the fake multi handle plays into the hooks during its next call.
#[derive(Debug, Clone)]
pub enum Callback {
    Socket(Descriptor, PollEvent),
    Timer(i64),
    Write(Token, Vec<u8>),
    Read(Token, usize),
    Progress(Token, XferInfo),
    /// Queue a done message.
    Finish(Token, TransferCode),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EasyOption {
    Url(String),
    Verbose(bool),
    Progress(bool),
    Upload(u64),
}

#[derive(Debug, Default)]
pub struct MultiState {
    pub created: usize,
    pub released: usize,
    pub fail_easy: bool,
    pub fail_add: Option<MultiError>,
    pub options: Vec<(usize, EasyOption)>,
    pub added: Vec<Token>,
    pub removed: Vec<Token>,
    pub actions: Vec<ActionTarget>,
    pub script: VecDeque<Callback>,
    pub done: VecDeque<Done>,
    pub written: Vec<usize>,
    pub read: Vec<(Token, Vec<u8>)>,
    pub error_message: Option<String>,
}

impl MultiState {
    pub fn options_of(&self, easy: usize) -> Vec<EasyOption> {
        self.options
            .iter()
            .filter(|(id, _)| *id == easy)
            .map(|(_, option)| option.clone())
            .collect()
    }
}

#[derive(Debug)]
pub struct FakeEasy {
    id: usize,
    state: Rc<RefCell<MultiState>>,
}

impl FakeEasy {
    fn record(&self, option: EasyOption) -> Result<(), TransferCode> {
        self.state.borrow_mut().options.push((self.id, option));
        Ok(())
    }
}

impl Easy for FakeEasy {
    fn set_url(&mut self, url: &str) -> Result<(), TransferCode> {
        self.record(EasyOption::Url(url.to_owned()))
    }

    fn set_verbose(&mut self, verbose: bool) -> Result<(), TransferCode> {
        self.record(EasyOption::Verbose(verbose))
    }

    fn set_progress(&mut self, enabled: bool) -> Result<(), TransferCode> {
        self.record(EasyOption::Progress(enabled))
    }

    fn set_upload(&mut self, size: u64) -> Result<(), TransferCode> {
        self.record(EasyOption::Upload(size))
    }

    fn error_message(&self) -> Option<String> {
        self.state.borrow().error_message.clone()
    }
}

impl Drop for FakeEasy {
    fn drop(&mut self) {
        self.state.borrow_mut().released += 1;
    }
}

#[derive(Debug)]
pub struct FakeMulti {
    state: Rc<RefCell<MultiState>>,
    easies: HashMap<Token, FakeEasy>,
}

impl FakeMulti {
    pub fn new() -> (Self, Rc<RefCell<MultiState>>) {
        let state = Rc::new(RefCell::new(MultiState::default()));
        let multi = Self {
            state: Rc::clone(&state),
            easies: HashMap::new(),
        };
        (multi, state)
    }

    fn play(&self, hooks: &mut dyn MultiHooks) {
        loop {
            let next = self.state.borrow_mut().script.pop_front();
            let Some(callback) = next else {
                break;
            };
            match callback {
                Callback::Socket(fd, event) => hooks.socket(fd, event),
                Callback::Timer(ms) => hooks.timer(ms),
                Callback::Write(token, data) => {
                    let taken = hooks.write(token, &data);
                    self.state.borrow_mut().written.push(taken);
                }
                Callback::Read(token, len) => {
                    let mut buf = vec![0; len];
                    let filled = hooks.read(token, &mut buf);
                    buf.truncate(filled);
                    self.state.borrow_mut().read.push((token, buf));
                }
                Callback::Progress(token, info) => hooks.progress(token, info),
                Callback::Finish(token, result) => {
                    self.state
                        .borrow_mut()
                        .done
                        .push_back(Done { token, result });
                }
            }
        }
    }
}

impl Multi for FakeMulti {
    type Easy = FakeEasy;

    fn easy(&mut self) -> Option<FakeEasy> {
        let mut state = self.state.borrow_mut();
        if state.fail_easy {
            return None;
        }
        state.created += 1;
        Some(FakeEasy {
            id: state.created,
            state: Rc::clone(&self.state),
        })
    }

    fn add(
        &mut self,
        token: Token,
        easy: FakeEasy,
        hooks: &mut dyn MultiHooks,
    ) -> Result<(), MultiError> {
        let fail = self.state.borrow().fail_add;
        if let Some(e) = fail {
            drop(easy);
            return Err(e);
        }
        self.state.borrow_mut().added.push(token);
        self.easies.insert(token, easy);
        self.play(hooks);
        Ok(())
    }

    fn remove(&mut self, token: Token, _hooks: &mut dyn MultiHooks) -> Result<FakeEasy, MultiError> {
        let easy = self.easies.remove(&token).ok_or(MultiError::BadEasyHandle)?;
        self.state.borrow_mut().removed.push(token);
        Ok(easy)
    }

    fn socket_action(
        &mut self,
        target: ActionTarget,
        hooks: &mut dyn MultiHooks,
    ) -> Result<usize, MultiError> {
        self.state.borrow_mut().actions.push(target);
        self.play(hooks);
        let finished = self.state.borrow().done.len();
        Ok(self.easies.len().saturating_sub(finished))
    }

    fn info_read(&mut self) -> Option<Done> {
        self.state.borrow_mut().done.pop_front()
    }
}

// MQTT library

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    TlsSet(PathBuf),
    UsernamePw(String, String),
    WillSet(Will),
    Connect(String, u16, u16),
    Disconnect,
    Publish(String, Vec<u8>, QoS, bool),
    Subscribe(String, QoS),
    Unsubscribe(String),
    LoopRead,
    LoopWrite,
    LoopMisc,
}

#[derive(Debug, Default)]
pub struct BackendState {
    pub calls: Vec<Call>,
    /// Failures by method name, returned on every call of that method.
    pub failures: HashMap<&'static str, mqtt::Error>,
    pub next_mid: MessageId,
    pub socket: Option<Descriptor>,
    pub want_write: bool,
    pub tls_active: bool,
    pub events: VecDeque<Event>,
}

impl BackendState {
    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| matches(call)).count()
    }
}

#[derive(Debug)]
pub struct FakeBackend {
    state: Rc<RefCell<BackendState>>,
}

pub const MQTT_SOCKET: Descriptor = 7;

impl FakeBackend {
    pub fn new() -> (Self, Rc<RefCell<BackendState>>) {
        let state = Rc::new(RefCell::new(BackendState {
            socket: Some(MQTT_SOCKET),
            ..BackendState::default()
        }));
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }

    fn call(&self, name: &'static str, call: Call) -> Result<(), mqtt::Error> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        match state.failures.get(name) {
            Some(e) => Err(*e),
            None => Ok(()),
        }
    }

    fn request(&self, name: &'static str, call: Call) -> Result<MessageId, mqtt::Error> {
        self.call(name, call)?;
        let mut state = self.state.borrow_mut();
        state.next_mid += 1;
        Ok(state.next_mid)
    }
}

impl Backend for FakeBackend {
    fn tls_set(&mut self, ca_file: &Path) -> Result<(), mqtt::Error> {
        self.call("tls_set", Call::TlsSet(ca_file.to_path_buf()))?;
        self.state.borrow_mut().tls_active = true;
        Ok(())
    }

    fn username_pw_set(&mut self, username: &str, password: &str) -> Result<(), mqtt::Error> {
        self.call(
            "username_pw_set",
            Call::UsernamePw(username.to_owned(), password.to_owned()),
        )
    }

    fn will_set(&mut self, will: &Will) -> Result<(), mqtt::Error> {
        self.call("will_set", Call::WillSet(will.clone()))
    }

    fn connect(&mut self, host: &str, port: u16, keepalive: u16) -> Result<(), mqtt::Error> {
        self.call("connect", Call::Connect(host.to_owned(), port, keepalive))
    }

    fn disconnect(&mut self) -> Result<(), mqtt::Error> {
        self.call("disconnect", Call::Disconnect)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<MessageId, mqtt::Error> {
        self.request(
            "publish",
            Call::Publish(topic.to_owned(), payload.to_vec(), qos, retain),
        )
    }

    fn subscribe(&mut self, pattern: &str, qos: QoS) -> Result<MessageId, mqtt::Error> {
        self.request("subscribe", Call::Subscribe(pattern.to_owned(), qos))
    }

    fn unsubscribe(&mut self, pattern: &str) -> Result<MessageId, mqtt::Error> {
        self.request("unsubscribe", Call::Unsubscribe(pattern.to_owned()))
    }

    fn loop_read(&mut self) -> Result<(), mqtt::Error> {
        self.call("loop_read", Call::LoopRead)
    }

    fn loop_write(&mut self) -> Result<(), mqtt::Error> {
        self.call("loop_write", Call::LoopWrite)
    }

    fn loop_misc(&mut self) -> Result<(), mqtt::Error> {
        self.call("loop_misc", Call::LoopMisc)
    }

    fn want_write(&self) -> bool {
        self.state.borrow().want_write
    }

    fn socket(&self) -> Option<Descriptor> {
        self.state.borrow().socket
    }

    fn tls_active(&self) -> bool {
        self.state.borrow().tls_active
    }

    fn next_event(&mut self) -> Option<Event> {
        self.state.borrow_mut().events.pop_front()
    }
}

#[derive(Debug, Default)]
pub struct LibraryState {
    pub inits: usize,
    pub cleanups: usize,
    pub fail_init: Option<mqtt::Error>,
    pub checked_topics: Vec<String>,
}

#[derive(Debug)]
pub struct FakeLibrary {
    state: Rc<RefCell<LibraryState>>,
}

impl FakeLibrary {
    pub fn new() -> (Self, Rc<RefCell<LibraryState>>) {
        let state = Rc::new(RefCell::new(LibraryState::default()));
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl Library for FakeLibrary {
    fn init(&mut self) -> Result<(), mqtt::Error> {
        let mut state = self.state.borrow_mut();
        state.inits += 1;
        match state.fail_init {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn cleanup(&mut self) -> Result<(), mqtt::Error> {
        self.state.borrow_mut().cleanups += 1;
        Ok(())
    }

    fn version(&self) -> (u32, u32, u32) {
        (2, 0, 18)
    }

    fn sub_topic_check(&self, topic: &str) -> Result<(), mqtt::Error> {
        self.state.borrow_mut().checked_topics.push(topic.to_owned());
        mqtt::topic::check_subscription(topic)
    }
}

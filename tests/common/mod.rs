//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use grafit_chat::{
    ChatView, CompletionProvider, Error, FragmentStream, InputEvent, Message, Notice, Result,
    Session, Transcriber, TurnProcessor,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const INSTRUCTION: &str = "Tu aides à modéliser des circuits électriques.";

/// Fresh session seeded with the test instruction
#[must_use]
pub fn new_session() -> Session {
    Session::new(INSTRUCTION)
}

/// Transcriber returning a fixed result and counting calls
pub struct MockTranscriber {
    result: std::result::Result<String, String>,
    calls: Mutex<Vec<Vec<u8>>>,
}

impl MockTranscriber {
    pub fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(reason.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        self.calls.lock().unwrap().push(audio.to_vec());
        self.result.clone().map_err(Error::Transcription)
    }
}

/// One scripted stream item
#[derive(Clone)]
pub enum Script {
    Fragment(&'static str),
    Fail(&'static str),
    Stall(Duration),
}

/// Completion provider replaying a script and recording what it was sent
pub struct MockCompletion {
    script: Vec<Script>,
    refuse: Option<&'static str>,
    requests: Mutex<Vec<(String, Vec<Message>)>>,
}

impl MockCompletion {
    pub fn fragments(fragments: &[&'static str]) -> Arc<Self> {
        Self::scripted(fragments.iter().copied().map(Script::Fragment).collect())
    }

    pub fn scripted(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script,
            refuse: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Provider whose request itself fails
    pub fn refusing(reason: &'static str) -> Arc<Self> {
        Arc::new(Self {
            script: Vec::new(),
            refuse: Some(reason),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<(String, Vec<Message>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn stream_completion(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<FragmentStream> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));

        if let Some(reason) = self.refuse {
            return Err(Error::Completion(reason.to_string()));
        }

        let script = self.script.clone();
        Ok(futures::stream::iter(script)
            .then(|item| async move {
                match item {
                    Script::Fragment(fragment) => Ok(fragment.to_string()),
                    Script::Fail(reason) => Err(Error::Completion(reason.to_string())),
                    Script::Stall(delay) => {
                        tokio::time::sleep(delay).await;
                        Ok(String::new())
                    }
                }
            })
            .boxed())
    }
}

/// Everything a view was asked to render, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Message(Message),
    BeginReply,
    Fragment(String),
    EndReply(bool),
    Notice(Notice),
}

#[derive(Default)]
pub struct RecordingView {
    pub events: Vec<Rendered>,
}

impl RecordingView {
    pub fn fragments(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Rendered::Fragment(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Rendered::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ChatView for RecordingView {
    fn show_message(&mut self, message: &Message) {
        self.events.push(Rendered::Message(message.clone()));
    }

    fn begin_reply(&mut self) {
        self.events.push(Rendered::BeginReply);
    }

    fn show_fragment(&mut self, fragment: &str) {
        self.events.push(Rendered::Fragment(fragment.to_string()));
    }

    fn end_reply(&mut self, completed: bool) {
        self.events.push(Rendered::EndReply(completed));
    }

    fn show_notice(&mut self, notice: &Notice) {
        self.events.push(Rendered::Notice(notice.clone()));
    }
}

/// Processor wired to mocks with the default test model
pub fn processor(
    transcriber: Arc<MockTranscriber>,
    completion: Arc<MockCompletion>,
) -> TurnProcessor {
    TurnProcessor::new(transcriber, completion, "test-model")
}

/// Typed text input
pub fn text(input: &str) -> InputEvent {
    InputEvent::Text(input.to_string())
}

/// Expected (role, content) pair
pub fn pair(role: &str, content: &str) -> (String, String) {
    (role.to_string(), content.to_string())
}

/// Visible transcript as (role, content) pairs
pub fn visible(session: &Session) -> Vec<(String, String)> {
    session
        .visible()
        .map(|m| (m.role().to_string(), m.content().to_string()))
        .collect()
}

/// Raw HTTP/1.1 response with a fixed body
pub fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Serve one canned response on localhost
///
/// Returns the `/v1` base URL and a handle that yields the raw request.
pub async fn serve_once(response: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (base_url, handle)
}

/// Read one request: headers, then the body when a length is given
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let complete = match length {
                Some(len) => buf.len() >= end + 4 + len,
                None if head.contains("transfer-encoding: chunked") => {
                    buf.ends_with(b"0\r\n\r\n")
                }
                None => true,
            };
            if complete {
                break;
            }
        }

        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    String::from_utf8_lossy(&buf).into_owned()
}

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const STUB_API_KEY: &str = "sk-test";

#[derive(Debug, Clone)]
pub struct StubArticle {
    pub id: String,
    pub title: String,
    pub extract: String,
    pub thumbnail: Option<String>,
    pub media: Vec<String>,
    /// When set, the media-list endpoint answers 500.
    pub media_fails: bool,
}

impl StubArticle {
    pub fn new(id: &str, extract: &str) -> Self {
        Self {
            id: id.to_owned(),
            title: id.replace('_', " "),
            extract: extract.to_owned(),
            thumbnail: None,
            media: Vec::new(),
            media_fails: false,
        }
    }

    pub fn with_thumbnail(mut self, url: &str) -> Self {
        self.thumbnail = Some(url.to_owned());
        self
    }

    pub fn with_media(mut self, srcs: &[&str]) -> Self {
        self.media = srcs.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    pub fn with_failing_media(mut self) -> Self {
        self.media_fails = true;
        self
    }

    fn summary_json(&self) -> Value {
        let mut value = serde_json::json!({
            "title": self.title,
            "extract": self.extract,
        });
        if let Some(source) = &self.thumbnail {
            value["thumbnail"] = serde_json::json!({ "source": source });
        }
        value
    }

    fn media_list_json(&self) -> Value {
        let items = self
            .media
            .iter()
            .enumerate()
            .map(|(idx, src)| {
                serde_json::json!({
                    "type": "image",
                    "title": format!("File:{}_{idx}.jpg", self.id),
                    "srcset": [{ "src": src, "scale": "1x" }],
                })
            })
            .collect::<Vec<_>>();
        serde_json::json!({ "items": items })
    }
}

/// Serves `/api/rest_v1/page/{summary,media-list}/{id}`; unknown ids get 404.
pub struct WikiStub {
    pub api_base: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl WikiStub {
    pub fn spawn(articles: Vec<StubArticle>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start wiki stub server");
        let addr = server.server_addr();
        let api_base = format!("http://{addr}/api/rest_v1");
        let articles = articles
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect::<HashMap<_, _>>();

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                let routed = path
                    .strip_prefix("/api/rest_v1/page/")
                    .and_then(|rest| rest.split_once('/'))
                    .and_then(|(kind, id)| articles.get(id).map(|article| (kind, article)));

                let body = match routed {
                    Some(("summary", article)) => Ok(article.summary_json()),
                    Some(("media-list", article)) if article.media_fails => Err(500),
                    Some(("media-list", article)) => Ok(article.media_list_json()),
                    _ => Err(404),
                };

                let response = match body {
                    Ok(value) => json_response(value.to_string(), 200),
                    Err(status) => json_response(
                        serde_json::json!({ "title": "Not found." }).to_string(),
                        status,
                    ),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            api_base,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for WikiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Chat completions stub that replays scripted outputs in order and records
/// the user prompt of every call. Once the script runs out it answers `[]`.
pub struct OpenAiStub {
    pub base_url: String,
    prompts: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl OpenAiStub {
    pub fn spawn(outputs: Vec<String>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start openai stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let script = Arc::new(Mutex::new(VecDeque::from(outputs)));
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&prompts);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post || path != "/v1/chat/completions" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let authorized = request.headers().iter().any(|h| {
                    h.field.equiv("Authorization")
                        && h.value.as_str() == format!("Bearer {STUB_API_KEY}")
                });
                if !authorized {
                    let _ = request.respond(json_response(
                        serde_json::json!({ "error": { "message": "bad api key" } }).to_string(),
                        401,
                    ));
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                let prompt = parsed
                    .get("messages")
                    .and_then(Value::as_array)
                    .and_then(|messages| {
                        messages
                            .iter()
                            .rev()
                            .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))
                    })
                    .and_then(|m| m.get("content"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                recorded.lock().expect("prompts lock").push(prompt);

                let output = script
                    .lock()
                    .expect("script lock")
                    .pop_front()
                    .unwrap_or_else(|| "[]".to_owned());

                let response_body = serde_json::json!({
                    "id": "chatcmpl-stub",
                    "object": "chat.completion",
                    "model": parsed.get("model").cloned().unwrap_or(Value::String("stub-model".to_owned())),
                    "choices": [
                        {
                            "index": 0,
                            "message": { "role": "assistant", "content": output },
                            "finish_reason": "stop"
                        }
                    ]
                });
                let _ = request.respond(json_response(response_body.to_string(), 200));
            }
        });

        Self {
            base_url,
            prompts,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl Drop for OpenAiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn json_response(body: String, status: u16) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(body)
        .with_status_code(status)
        .with_header(header)
}

/// A model output holding `count` well-formed modules titled `{prefix} {n}`.
pub fn modules_output(prefix: &str, start: usize, count: usize) -> String {
    let modules = (start..start + count)
        .map(|n| {
            serde_json::json!({
                "title": format!("{prefix} {n}"),
                "lessonText": format!("Lesson about **{prefix} {n}**."),
                "summary": format!("{prefix} {n} in brief."),
                "quiz": (0..3).map(|q| serde_json::json!({
                    "question": format!("Question {q}?"),
                    "options": ["a", "b", "c", "d"],
                    "correctAnswer": q,
                    "explanation": "Because.",
                })).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    Value::Array(modules).to_string()
}

pub fn quiz_output(count: usize) -> String {
    let questions = (0..count)
        .map(|q| {
            serde_json::json!({
                "question": format!("Question {q}?"),
                "options": ["a", "b", "c", "d"],
                "correctAnswer": 1,
                "explanation": "Because.",
            })
        })
        .collect::<Vec<_>>();
    Value::Array(questions).to_string()
}

/// Environment pointing the pipeline at the two stubs.
pub fn stub_env(wiki: &WikiStub, openai: &OpenAiStub) -> Vec<(&'static str, String)> {
    vec![
        ("OPENAI_API_KEY", STUB_API_KEY.to_owned()),
        ("OPENAI_BASE_URL", openai.base_url.clone()),
        ("JOURNEYGEN_WIKI_API_BASE", wiki.api_base.clone()),
        ("JOURNEYGEN_HTTP_TIMEOUT_SECS", "5".to_owned()),
        ("JOURNEYGEN_MODEL_TIMEOUT_SECS", "5".to_owned()),
    ]
}

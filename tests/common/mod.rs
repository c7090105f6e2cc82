// Shared helpers for the integration tests: in-memory PDFs with link
// annotations and a tiny HTTP server on a loopback port.

#![allow(dead_code)] // each test file uses a different subset

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::Duration;

use attachment_harvester::HarvestConfig;
use lopdf::{dictionary, Dictionary, Document, Object};

// ── PDF builder ──────────────────────────────────────────────────────────────

/// One annotation on a test page.
pub enum Annot {
    /// `/Subtype /Link` with a URI action, stored as an indirect object.
    Uri(String),
    /// Same, but the annotation dictionary is inline in `/Annots`.
    InlineUri(String),
    /// A link that jumps inside the document.
    GoTo,
    /// A form widget carrying a URI action. Not a link annotation.
    Widget(String),
}

impl Annot {
    pub fn uri(uri: impl Into<String>) -> Self {
        Annot::Uri(uri.into())
    }
}

fn uri_action(uri: &str) -> Dictionary {
    dictionary! {
        "S" => "URI",
        "URI" => Object::string_literal(uri),
    }
}

fn annotation(annot: &Annot) -> Dictionary {
    let rect = vec![
        Object::Integer(10),
        Object::Integer(10),
        Object::Integer(100),
        Object::Integer(30),
    ];
    match annot {
        Annot::Uri(uri) | Annot::InlineUri(uri) => dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect,
            "A" => uri_action(uri),
        },
        Annot::GoTo => dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect,
            "A" => dictionary! { "S" => "GoTo", "D" => vec![Object::Integer(0)] },
        },
        Annot::Widget(uri) => dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => rect,
            "A" => uri_action(uri),
        },
    }
}

/// Serialize a PDF with one page per entry of `pages`.
pub fn pdf_bytes(pages: &[Vec<Annot>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for annots in pages {
        let mut entries = Vec::new();
        for annot in annots {
            let dict = annotation(annot);
            match annot {
                Annot::InlineUri(_) => entries.push(Object::Dictionary(dict)),
                _ => entries.push(Object::Reference(doc.add_object(dict))),
            }
        }
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Annots" => entries,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Write a single-page PDF linking `uris` into `dir/name`.
pub fn write_pdf(dir: &Path, name: &str, uris: &[&str]) -> PathBuf {
    let annots = uris.iter().map(|u| Annot::uri(*u)).collect();
    let path = dir.join(name);
    std::fs::write(&path, pdf_bytes(&[annots])).unwrap();
    path
}

// ── Mock HTTP server ─────────────────────────────────────────────────────────

/// A canned response.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Wait this long before answering.
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "application/octet-stream".into())],
            body: body.to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Replies for one path, served in order. The last one repeats.
struct Route {
    replies: Vec<Reply>,
    hits: usize,
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;

/// Serves fixed responses by request path (query included) until the test
/// process exits. Unknown paths get a 404.
pub struct MockServer {
    base: String,
    routes: Routes,
}

impl MockServer {
    pub fn start(routes: &[(&str, Reply)]) -> Self {
        let sequences: Vec<(&str, Vec<Reply>)> = routes
            .iter()
            .map(|(path, reply)| (*path, vec![reply.clone()]))
            .collect();
        Self::start_sequences(&sequences)
    }

    /// Like [`start`](Self::start), but each path answers with its replies in
    /// turn, repeating the last.
    pub fn start_sequences(routes: &[(&str, Vec<Reply>)]) -> Self {
        bypass_proxies();

        let routes: Routes = Arc::new(Mutex::new(
            routes
                .iter()
                .map(|(path, replies)| {
                    let route = Route {
                        replies: replies.clone(),
                        hits: 0,
                    };
                    (path.to_string(), route)
                })
                .collect(),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let shared = Arc::clone(&routes);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve(stream, &shared);
            }
        });

        Self { base, routes }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Requests received for `path` so far.
    pub fn hits(&self, path: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .get(path)
            .map_or(0, |route| route.hits)
    }
}

fn next_reply(routes: &Routes, path: &str) -> Reply {
    let mut routes = routes.lock().unwrap();
    match routes.get_mut(path) {
        Some(route) if !route.replies.is_empty() => {
            let i = route.hits.min(route.replies.len() - 1);
            route.hits += 1;
            route.replies[i].clone()
        }
        _ => Reply::status(404),
    }
}

fn serve(mut stream: TcpStream, routes: &Routes) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let text = String::from_utf8_lossy(&request);
    let path = text.split_whitespace().nth(1).unwrap_or("/").to_string();
    let reply = next_reply(routes, &path);
    if !reply.delay.is_zero() {
        thread::sleep(reply.delay);
    }

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reason(reply.status),
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&reply.body);
    let _ = stream.flush();
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// A URL on a loopback port nobody listens on.
pub fn refused_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{path}")
}

/// Keep loopback requests away from any proxy configured in the environment.
fn bypass_proxies() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        std::env::set_var("no_proxy", "127.0.0.1,localhost");
    });
}

// ── Config ───────────────────────────────────────────────────────────────────

/// Source and destination folders inside one temp dir.
pub struct Workspace {
    _root: tempfile::TempDir,
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        bypass_proxies();
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("Submittals");
        let dest = root.path().join("attachments");
        std::fs::create_dir(&source).unwrap();
        Self {
            _root: root,
            source,
            dest,
        }
    }

    pub fn config(&self) -> HarvestConfig {
        HarvestConfig {
            source_dir: self.source.clone(),
            dest_dir: self.dest.clone(),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }
}

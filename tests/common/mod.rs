#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

/// Files held by the simulated backend, keyed by absolute path.
pub type FileStore = web::Data<Mutex<HashMap<String, web::Bytes>>>;

pub fn new_store() -> FileStore {
    web::Data::new(Mutex::new(HashMap::new()))
}

/// Starts an HttpFS-like backend on an ephemeral port.
pub fn start_backend(store: FileStore) -> SocketAddr {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .route("/webhdfs/v1{path:.*}", web::to(webhdfs))
    })
    .workers(1)
    .bind("127.0.0.1:0")
    .unwrap();
    let addr = server.addrs()[0];
    actix_rt::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

/// Starts a backend that fails every request with the given exception.
pub fn start_failing_backend(status: u16, exception: &'static str) -> SocketAddr {
    let server = HttpServer::new(move || {
        App::new().default_service(web::to(move || async move {
            HttpResponse::build(actix_web::http::StatusCode::from_u16(status).unwrap()).json(
                serde_json::json!({"RemoteException": {
                    "exception": exception,
                    "javaClassName": format!("org.apache.hadoop.{}", exception),
                    "message": "simulated failure"
                }}),
            )
        }))
    })
    .workers(1)
    .bind("127.0.0.1:0")
    .unwrap();
    let addr = server.addrs()[0];
    actix_rt::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

/// An address nothing listens on.
pub fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn not_found(path: &str) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({"RemoteException": {
        "exception": "FileNotFoundException",
        "javaClassName": "java.io.FileNotFoundException",
        "message": format!("File {} does not exist.", path)
    }}))
}

fn file_status(suffix: &str, length: usize) -> serde_json::Value {
    serde_json::json!({
        "accessTime": 0, "blockSize": 134217728, "group": "hadoop", "length": length,
        "modificationTime": 1, "owner": "svc", "pathSuffix": suffix,
        "permission": "644", "replication": 3, "type": "FILE"
    })
}

async fn webhdfs(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    body: web::Bytes,
    store: FileStore,
) -> HttpResponse {
    let path = path.into_inner();
    let op = query.get("op").cloned().unwrap_or_default();
    let user = query.get("user.name").cloned().unwrap_or_default();
    let mut files = store.lock().unwrap();
    match op.as_str() {
        "GETHOMEDIRECTORY" => {
            HttpResponse::Ok().json(serde_json::json!({ "Path": format!("/user/{}", user) }))
        }
        "CREATE" => {
            assert_eq!(req.method(), actix_web::http::Method::PUT);
            assert_eq!(query.get("data").map(String::as_str), Some("true"));
            let overwrite = query.get("overwrite").map(String::as_str) == Some("true");
            if files.contains_key(&path) && !overwrite {
                return HttpResponse::Forbidden().json(serde_json::json!({"RemoteException": {
                    "exception": "FileAlreadyExistsException",
                    "javaClassName": "org.apache.hadoop.fs.FileAlreadyExistsException",
                    "message": format!("{} already exists", path)
                }}));
            }
            files.insert(path, body);
            HttpResponse::Created().finish()
        }
        "OPEN" => match files.get(&path) {
            Some(content) => {
                let offset: usize = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
                let content = content.slice(offset.min(content.len())..);
                HttpResponse::Ok()
                    .content_type("application/octet-stream")
                    .body(content)
            }
            None => not_found(&path),
        },
        "GETFILESTATUS" => match files.get(&path) {
            Some(content) => HttpResponse::Ok()
                .json(serde_json::json!({ "FileStatus": file_status("", content.len()) })),
            None => not_found(&path),
        },
        "LISTSTATUS" => {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            let statuses: Vec<serde_json::Value> = files
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| file_status(&k[prefix.len()..], v.len()))
                .collect();
            HttpResponse::Ok()
                .json(serde_json::json!({"FileStatuses": {"FileStatus": statuses}}))
        }
        "DELETE" => {
            let deleted = files.remove(&path).is_some();
            HttpResponse::Ok().json(serde_json::json!({ "boolean": deleted }))
        }
        _ => HttpResponse::BadRequest().json(serde_json::json!({"RemoteException": {
            "exception": "IllegalArgumentException",
            "javaClassName": "java.lang.IllegalArgumentException",
            "message": format!("Invalid value for webhdfs parameter \"op\": {}", op)
        }})),
    }
}

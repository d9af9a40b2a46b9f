use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reqwest::Client;
use reqwest::header::HeaderMap;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tempfile::TempDir;

use ::common::storage::filesystem::FilesystemBlobStore;
use server::config::{AppConfig, DatabaseConfig, ServerConfig, StorageBackend, StorageConfig};
use server::state::AppState;

pub mod routes {
    pub const UPLOAD: &str = "/upload";

    pub fn image(id: i32) -> String {
        format!("/image/{id}")
    }

    pub fn image_metadata(id: i32) -> String {
        format!("/image/{id}/metadata")
    }
}

/// Upload ceiling used by every test server.
pub const MAX_UPLOAD_SIZE: usize = 256 * 1024;

/// A running test server over a temporary SQLite database and blob root.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub blob_root: PathBuf,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let blob_root = dir.path().join("blobs");

        let db = server::database::init_db(&db_url, 4)
            .await
            .expect("Failed to initialize test database");
        let blobs = FilesystemBlobStore::new(blob_root.clone())
            .await
            .expect("Failed to open blob store");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                public_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 4,
            },
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                root: blob_root.clone(),
                max_upload_size: MAX_UPLOAD_SIZE,
                object: None,
            },
        };

        let state = AppState::new(app_config, db.clone(), Arc::new(blobs));
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            blob_root,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header(name, value)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Upload `bytes` as the `image` field with an explicit MIME type.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>, mime: &str) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new().part("image", part);
        self.send_form(form).await
    }

    pub async fn upload_png(&self, file_name: &str, bytes: Vec<u8>) -> TestResponse {
        self.upload(file_name, bytes, "image/png").await
    }

    pub async fn send_form(&self, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(routes::UPLOAD))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Number of stored blob files, excluding in-flight temporaries.
    pub fn blob_count(&self) -> usize {
        let mut count = 0;
        for shard in std::fs::read_dir(&self.blob_root).expect("blob root missing") {
            let shard = shard.unwrap();
            if shard.file_name() == ".tmp" || !shard.path().is_dir() {
                continue;
            }
            count += std::fs::read_dir(shard.path()).unwrap().count();
        }
        count
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            bytes,
            body,
        }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn image(&self) -> DynamicImage {
        image::load_from_memory(&self.bytes).expect("response body should be an image")
    }
}

/// A `width` x `height` gradient, varied by `seed` so different seeds hash differently.
pub fn sample_image(width: u32, height: u32, seed: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, seed])
    }))
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("Failed to encode test image");
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    encode(&sample_image(width, height, seed), ImageFormat::Png)
}

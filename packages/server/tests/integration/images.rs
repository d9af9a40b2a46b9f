use futures::future::join_all;
use image::{GenericImageView, ImageFormat};
use sea_orm::{EntityTrait, PaginatorTrait};
use server::entity::image_metadata;

use crate::common::{MAX_UPLOAD_SIZE, TestApp, encode, png_bytes, routes, sample_image};

mod upload {
    use super::*;

    #[tokio::test]
    async fn new_image_is_created() {
        let app = TestApp::spawn().await;

        let res = app.upload_png("cat.png", png_bytes(10, 10, 1)).await;

        assert_eq!(res.status, 201, "{}", res.text());
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["message"], "File cat.png uploaded successfully");
        let id = res.id();
        assert_eq!(
            res.body["url"].as_str().unwrap(),
            format!("http://localhost:8080/image/{id}")
        );
        assert!(res.body.get("error").is_none());
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_upload_returns_existing_id() {
        let app = TestApp::spawn().await;
        let bytes = png_bytes(12, 12, 2);

        let first = app.upload_png("a.png", bytes.clone()).await;
        let second = app.upload_png("renamed.png", bytes).await;

        assert_eq!(first.status, 201);
        assert_eq!(second.status, 200);
        assert_eq!(second.body["message"], "File already exists");
        assert_eq!(first.id(), second.id());
        assert_eq!(app.blob_count(), 1);
        assert_eq!(image_metadata::Entity::find().count(&app.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn different_content_gets_different_ids() {
        let app = TestApp::spawn().await;

        let a = app.upload_png("a.png", png_bytes(8, 8, 1)).await;
        let b = app.upload_png("b.png", png_bytes(8, 8, 2)).await;

        assert_eq!(a.status, 201);
        assert_eq!(b.status, 201);
        assert!(b.id() > a.id());
        assert_eq!(app.blob_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_identical_uploads_converge() {
        let app = TestApp::spawn().await;
        let bytes = png_bytes(16, 16, 9);

        let uploads = (0..6).map(|_| app.upload_png("same.png", bytes.clone()));
        let responses = join_all(uploads).await;

        let ids: Vec<i32> = responses.iter().map(|r| r.id()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]), "ids diverged: {ids:?}");
        assert_eq!(responses.iter().filter(|r| r.status == 201).count(), 1);
        assert_eq!(app.blob_count(), 1);
        assert_eq!(image_metadata::Entity::find().count(&app.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unsupported_content_type_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload("anim.gif", b"GIF89a".to_vec(), "image/gif").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["success"], false);
        assert!(
            res.body["error"]
                .as_str()
                .unwrap()
                .contains("unsupported image format: gif")
        );
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_png("huge.png", vec![0u8; MAX_UPLOAD_SIZE + 1])
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["success"], false);
        assert!(res.body["error"].as_str().unwrap().contains("too big"));
    }

    #[tokio::test]
    async fn missing_image_field_is_rejected() {
        let app = TestApp::spawn().await;

        let form = reqwest::multipart::Form::new().text("owner_id", "3");
        let res = app.send_form(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "no image uploaded");
    }

    #[tokio::test]
    async fn owner_id_is_recorded() {
        let app = TestApp::spawn().await;

        let part = reqwest::multipart::Part::bytes(png_bytes(4, 4, 5))
            .file_name("owned.png")
            .mime_str("image/png")
            .unwrap();
        let form = reqwest::multipart::Form::new()
            .text("owner_id", "42")
            .part("image", part);
        let res = app.send_form(form).await;
        assert_eq!(res.status, 201);

        let meta = app.get(&routes::image_metadata(res.id())).await;
        assert_eq!(meta.body["owner_id"], 42);
    }

    #[tokio::test]
    async fn content_type_is_guessed_from_filename_when_absent() {
        let app = TestApp::spawn().await;

        let part = reqwest::multipart::Part::bytes(png_bytes(4, 4, 6)).file_name("guess.png");
        let form = reqwest::multipart::Form::new().part("image", part);
        let res = app.send_form(form).await;

        assert_eq!(res.status, 201, "{}", res.text());
    }
}

mod retrieve {
    use super::*;

    #[tokio::test]
    async fn untransformed_png_is_pixel_identical() {
        let app = TestApp::spawn().await;
        let original = sample_image(30, 20, 3);
        let id = app
            .upload_png("orig.png", encode(&original, ImageFormat::Png))
            .await
            .id();

        let res = app.get(&routes::image(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("image/png"));
        assert_eq!(res.image().to_rgb8(), original.to_rgb8());
    }

    #[tokio::test]
    async fn resize_and_grayscale_keep_png() {
        let app = TestApp::spawn().await;
        let id = app.upload_png("big.png", png_bytes(100, 100, 4)).await.id();

        let res = app
            .get(&format!(
                "{}?width=50&height=50&grayscale=true",
                routes::image(id)
            ))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("image/png"));
        let img = res.image();
        assert_eq!(img.dimensions(), (50, 50));
        assert!(img.to_rgb8().pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    }

    #[tokio::test]
    async fn zero_width_skips_resize() {
        let app = TestApp::spawn().await;
        let id = app.upload_png("keep.png", png_bytes(40, 30, 4)).await.id();

        let res = app
            .get(&format!("{}?width=0&height=10", routes::image(id)))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.image().dimensions(), (40, 30));
    }

    #[tokio::test]
    async fn malformed_parameters_are_ignored() {
        let app = TestApp::spawn().await;
        let original = sample_image(16, 16, 8);
        let id = app
            .upload_png("p.png", encode(&original, ImageFormat::Png))
            .await
            .id();

        let res = app
            .get(&format!(
                "{}?width=abc&height=10&blur=lots&brightness=&grayscale=yes&rotate=x",
                routes::image(id)
            ))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.image().to_rgb8(), original.to_rgb8());
    }

    #[tokio::test]
    async fn explicit_format_converts_to_jpeg() {
        let app = TestApp::spawn().await;
        let id = app.upload_png("c.png", png_bytes(10, 10, 1)).await.id();

        let res = app.get(&format!("{}?format=jpg", routes::image(id))).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("image/jpeg"));
        assert_eq!(&res.bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn jpeg_upload_is_served_as_jpeg() {
        let app = TestApp::spawn().await;
        let jpeg = encode(&sample_image(20, 20, 7), ImageFormat::Jpeg);
        let id = app.upload("photo.jpg", jpeg, "image/jpeg").await.id();

        let res = app.get(&format!("{}?fliph=true", routes::image(id))).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("image/jpeg"));
        assert_eq!(res.image().dimensions(), (20, 20));
    }

    #[tokio::test]
    async fn unsupported_format_names_supported_set() {
        let app = TestApp::spawn().await;
        let id = app.upload_png("d.png", png_bytes(4, 4, 1)).await.id();

        let res = app.get(&format!("{}?format=gif", routes::image(id))).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "UNSUPPORTED_FORMAT");
        let message = res.body["message"].as_str().unwrap();
        assert!(message.contains("gif"));
        assert!(message.contains("jpg, jpeg, png"));
    }

    #[tokio::test]
    async fn oversized_resize_is_rejected() {
        let app = TestApp::spawn().await;
        let id = app.upload_png("e.png", png_bytes(4, 4, 1)).await.id();

        let res = app
            .get(&format!("{}?width=100000&height=10", routes::image(id)))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.get(&routes::image(999)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn non_numeric_id_is_bad_request() {
        let app = TestApp::spawn().await;
        let res = app.get("/image/abc").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn matching_etag_returns_not_modified() {
        let app = TestApp::spawn().await;
        let id = app.upload_png("f.png", png_bytes(6, 6, 1)).await.id();
        let path = format!("{}?invert=true", routes::image(id));

        let first = app.get(&path).await;
        let etag = first.header("etag").expect("etag header").to_string();
        assert_eq!(first.header("cache-control"), Some("private, max-age=3600"));

        let cached = app.get_with_header(&path, "if-none-match", &etag).await;
        assert_eq!(cached.status, 304);
        assert!(cached.bytes.is_empty());

        let other = app
            .get_with_header(&routes::image(id), "if-none-match", &etag)
            .await;
        assert_eq!(other.status, 200);
    }

    #[tokio::test]
    async fn metadata_describes_stored_image() {
        let app = TestApp::spawn().await;
        let bytes = png_bytes(5, 5, 2);
        let size = bytes.len();
        let id = app.upload_png("meta.PNG", bytes).await.id();

        let res = app.get(&routes::image_metadata(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id);
        assert_eq!(res.body["format"], "png");
        assert_eq!(res.body["size"], size as i64);
        assert!(res.body["owner_id"].is_null());
        let filename = res.body["filename"].as_str().unwrap();
        assert!(filename.ends_with(".png"));
        assert_eq!(filename.len(), 64 + 4);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_metadata_and_blob() {
        let app = TestApp::spawn().await;
        let id = app.upload_png("gone.png", png_bytes(8, 8, 1)).await.id();
        assert_eq!(app.blob_count(), 1);

        let res = app.delete(&routes::image(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["success"], "true");
        assert_eq!(res.body["message"], "Image deleted");
        assert_eq!(res.body["id"], id.to_string());
        assert_eq!(app.blob_count(), 0);

        let after = app.get(&routes::image(id)).await;
        assert_eq!(after.status, 404);
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.delete(&routes::image(77)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn reupload_after_delete_gets_new_id() {
        let app = TestApp::spawn().await;
        let bytes = png_bytes(8, 8, 3);
        let first = app.upload_png("again.png", bytes.clone()).await.id();
        app.delete(&routes::image(first)).await;

        let second = app.upload_png("again.png", bytes).await;

        assert_eq!(second.status, 201);
        assert!(second.id() > first);
    }
}

mod docs {
    use super::*;

    #[tokio::test]
    async fn openapi_document_lists_image_routes() {
        let app = TestApp::spawn().await;
        let res = app.get("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        let paths = &res.body["paths"];
        assert!(paths.get("/upload").is_some());
        assert!(paths.get("/image/{id}").is_some());
        assert!(paths.get("/image/{id}/metadata").is_some());
    }
}

use std::sync::Arc;

use crate::common::{FailingInsertStore, JPEG_BYTES, TestApp, routes};

mod image_upload {
    use super::*;

    #[tokio::test]
    async fn upload_returns_created_image() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("photo.JPG", "image/jpeg", JPEG_BYTES.to_vec())
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["message"], "Image uploaded successfully");

        let image = &res.body["image"];
        let filename = image["filename"].as_str().unwrap();
        assert!(image["id"].as_i64().unwrap() >= 1);
        assert!(filename.ends_with(".JPG"), "extension kept: {filename}");
        assert_ne!(filename, "photo.JPG");
        assert_eq!(image["original_filename"], "photo.JPG");
        assert_eq!(image["url"], format!("/images/{filename}"));
        assert_eq!(image["content_type"], "image/jpeg");
        assert_eq!(image["file_size"].as_i64().unwrap(), JPEG_BYTES.len() as i64);
        assert!(image["upload_timestamp"].is_string());

        assert_eq!(app.blob_names().await, vec![filename.to_string()]);
    }

    #[tokio::test]
    async fn file_field_alias_is_accepted() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_as("file", "photo.jpg", "image/jpeg", JPEG_BYTES.to_vec())
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn same_original_name_gets_distinct_storage_names() {
        let app = TestApp::spawn().await;

        let first = app.upload_jpeg("photo.jpg").await;
        let second = app.upload_jpeg("photo.jpg").await;

        assert_ne!(first["filename"], second["filename"]);
        assert_ne!(first["id"], second["id"]);
        assert_eq!(app.blob_names().await.len(), 2);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_without_writing() {
        let app = TestApp::spawn_with_config(|c| c.upload.max_size = 1024).await;

        let res = app
            .upload("big.jpg", "image/jpeg", vec![0xFF; 4096])
            .await;

        assert_eq!(res.status, 413, "{}", res.text);
        assert_eq!(res.code(), "PAYLOAD_TOO_LARGE");
        assert!(app.blob_names().await.is_empty());
    }

    #[tokio::test]
    async fn file_at_the_limit_is_accepted() {
        let app = TestApp::spawn_with_config(|c| c.upload.max_size = 1024).await;

        let res = app
            .upload("edge.jpg", "image/jpeg", vec![0xFF; 1024])
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["image"]["file_size"].as_i64().unwrap(), 1024);
    }

    #[tokio::test]
    async fn disallowed_content_type_is_rejected_without_writing() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("figure.png", "image/png", b"\x89PNG\r\n\x1a\n".to_vec())
            .await;

        assert_eq!(res.status, 415, "{}", res.text);
        assert_eq!(res.code(), "UNSUPPORTED_MEDIA_TYPE");
        assert!(app.blob_names().await.is_empty());
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload("empty.jpg", "image/jpeg", Vec::new()).await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert!(app.blob_names().await.is_empty());
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;

        let form = reqwest::multipart::Form::new().text("caption", "no file here");
        let res = app
            .client
            .post(app.url(routes::IMAGES))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn non_multipart_body_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(routes::IMAGES))
            .json(&serde_json::json!({ "image": "not a file" }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn traversal_in_original_name_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("../../etc/passwd.jpg", "image/jpeg", JPEG_BYTES.to_vec())
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert!(app.blob_names().await.is_empty());
    }

    #[tokio::test]
    async fn failed_metadata_insert_removes_the_blob() {
        let app = TestApp::spawn_with(Arc::new(FailingInsertStore::default()), |_| {}).await;

        let res = app
            .upload("photo.jpg", "image/jpeg", JPEG_BYTES.to_vec())
            .await;

        assert_eq!(res.status, 500, "{}", res.text);
        assert_eq!(res.code(), "INTERNAL_ERROR");
        assert!(
            !res.text.contains("10.1.2.3"),
            "internal detail leaked: {}",
            res.text
        );
        assert!(app.blob_names().await.is_empty());
    }
}

mod image_list {
    use super::*;

    #[tokio::test]
    async fn empty_listing() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::IMAGES).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["images"].as_array().unwrap().len(), 0);
        assert_eq!(res.body["metadata"]["total_count"], 0);
        assert_eq!(res.body["metadata"]["limit"], 10);
        assert_eq!(res.body["metadata"]["offset"], 0);
        assert_eq!(res.body["metadata"]["has_more"], false);
    }

    #[tokio::test]
    async fn newest_first() {
        let app = TestApp::spawn().await;
        let older = app.upload_jpeg("older.jpg").await;
        let newer = app.upload_jpeg("newer.jpg").await;

        let res = app.get(routes::IMAGES).await;

        let images = res.body["images"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0]["id"], newer["id"]);
        assert_eq!(images[1]["id"], older["id"]);
    }

    #[tokio::test]
    async fn limit_is_capped_and_has_more_reported() {
        let app = TestApp::spawn().await;
        for i in 0..21 {
            app.upload_jpeg(&format!("img{i}.jpg")).await;
        }

        let res = app.get(&format!("{}?limit=50", routes::IMAGES)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["images"].as_array().unwrap().len(), 20);
        assert_eq!(res.body["metadata"]["limit"], 20);
        assert_eq!(res.body["metadata"]["total_count"], 21);
        assert_eq!(res.body["metadata"]["has_more"], true);

        let res = app
            .get(&format!("{}?limit=20&offset=20", routes::IMAGES))
            .await;
        assert_eq!(res.body["images"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["metadata"]["offset"], 20);
        assert_eq!(res.body["metadata"]["has_more"], false);
    }

    #[tokio::test]
    async fn offset_past_the_end_is_empty() {
        let app = TestApp::spawn().await;
        app.upload_jpeg("only.jpg").await;

        let res = app.get(&format!("{}?offset=5", routes::IMAGES)).await;

        assert_eq!(res.status, 200);
        assert!(res.body["images"].as_array().unwrap().is_empty());
        assert_eq!(res.body["metadata"]["total_count"], 1);
    }

    #[tokio::test]
    async fn invalid_pagination_parameters_are_rejected() {
        let app = TestApp::spawn().await;

        for query in [
            "limit=0",
            "limit=-1",
            "limit=abc",
            "offset=-1",
            "offset=x",
            "offset=9223372036854775808",
            "offset=18446744073709551615",
        ] {
            let res = app.get(&format!("{}?{query}", routes::IMAGES)).await;
            assert_eq!(res.status, 400, "{query}: {}", res.text);
            assert_eq!(res.code(), "VALIDATION_ERROR", "{query}");
        }
    }
}

mod image_get {
    use super::*;

    #[tokio::test]
    async fn get_by_id() {
        let app = TestApp::spawn().await;
        let image = app.upload_jpeg("photo.jpg").await;

        let res = app.get(&routes::image(&image["id"])).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["image"], image);
    }

    #[tokio::test]
    async fn get_by_filename() {
        let app = TestApp::spawn().await;
        let image = app.upload_jpeg("photo.jpg").await;

        let res = app
            .get(&routes::image_by_filename(image["filename"].as_str().unwrap()))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["image"]["id"], image["id"]);

        let res = app.get(&routes::image_by_filename("missing.jpg")).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::image(999)).await;

        assert_eq!(res.status, 404, "{}", res.text);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_ids_are_rejected() {
        let app = TestApp::spawn().await;

        for id in ["0", "-1", "abc"] {
            let res = app.get(&routes::image(id)).await;
            assert_eq!(res.status, 400, "{id}: {}", res.text);
            assert_eq!(res.code(), "VALIDATION_ERROR");
        }
    }
}

mod image_delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_record_and_file() {
        let app = TestApp::spawn().await;
        let image = app.upload_jpeg("photo.jpg").await;

        let res = app.delete(&routes::image(&image["id"])).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Image deleted successfully");
        assert_eq!(res.body["id"], image["id"]);
        assert_eq!(res.body["filename"], image["filename"]);
        assert!(app.blob_names().await.is_empty());

        let res = app.get(&routes::image(&image["id"])).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let app = TestApp::spawn().await;
        let image = app.upload_jpeg("photo.jpg").await;

        assert_eq!(app.delete(&routes::image(&image["id"])).await.status, 200);

        let res = app.delete(&routes::image(&image["id"])).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn delete_succeeds_when_file_is_already_gone() {
        let app = TestApp::spawn().await;
        let image = app.upload_jpeg("photo.jpg").await;
        let filename = image["filename"].as_str().unwrap();
        std::fs::remove_file(app.blobs.base_path().join(filename)).unwrap();

        let res = app.delete(&routes::image(&image["id"])).await;

        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.delete(&routes::image("x")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

mod static_files {
    use super::*;

    #[tokio::test]
    async fn uploaded_file_is_served_in_local_env() {
        let app = TestApp::spawn().await;
        let image = app.upload_jpeg("photo.jpg").await;

        let res = app
            .client
            .get(app.url(&routes::public_file(image["filename"].as_str().unwrap())))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.bytes().await.unwrap().as_ref(), JPEG_BYTES);
    }

    #[tokio::test]
    async fn files_are_not_served_in_production() {
        let app = TestApp::spawn_with_config(|c| c.server.env = "production".into()).await;
        let image = app.upload_jpeg("photo.jpg").await;

        let res = app
            .get(&routes::public_file(image["filename"].as_str().unwrap()))
            .await;

        assert_eq!(res.status, 404);
    }
}

mod middleware {
    use super::*;

    #[tokio::test]
    async fn cors_allows_trusted_origin_only() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .get(app.url(routes::IMAGES))
            .header("Origin", "http://localhost:3000")
            .send()
            .await
            .unwrap();
        assert_eq!(
            res.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
        assert_eq!(res.headers()["access-control-allow-credentials"], "true");

        let res = app
            .client
            .get(app.url(routes::IMAGES))
            .header("Origin", "http://evil.example")
            .send()
            .await
            .unwrap();
        assert!(res.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn api_docs_are_served() {
        let app = TestApp::spawn().await;

        let res = app.get("/scalar").await;

        assert_eq!(res.status, 200);
        assert!(res.text.contains("/api/v1/images"), "openapi lists the image routes");
    }
}

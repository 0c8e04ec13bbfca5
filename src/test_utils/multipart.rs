use axum::{
    extract::{FromRequest, Multipart},
    http::Request,
};

/// A part of a multipart form body.
pub(crate) enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Build the [Multipart] extractor for a request to `uri` containing `parts`.
pub(crate) async fn must_make_multipart(uri: &str, parts: &[Part<'_>]) -> Multipart {
    let boundary = "MY_BOUNDARY123456789";
    let mut data: Vec<u8> = Vec::new();

    for part in parts {
        data.extend_from_slice(format!("--{boundary}\r\n").as_bytes());

        match part {
            Part::Text { name, value } => {
                data.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                data: file_data,
            } => {
                data.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                        Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                data.extend_from_slice(file_data);
                data.extend_from_slice(b"\r\n");
            }
        }
    }

    data.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(data.into())
        .unwrap();

    Multipart::from_request(request, &{}).await.unwrap()
}

#![allow(missing_docs)]

pub(crate) mod db;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;
pub(crate) mod multipart;

pub(crate) use db::{
    TEST_PASSWORD, create_test_user, get_test_cookie_key, get_test_db_connection,
    get_test_upload_dir,
};
pub(crate) use form::{
    assert_form_error_message, assert_form_input, assert_form_input_with_value,
    assert_form_submit_button, assert_form_submit_button_with_text, assert_hx_endpoint,
    must_get_form,
};
pub(crate) use html::{
    assert_valid_html, count_elements, must_get_text, parse_html_document, parse_html_fragment,
};
pub(crate) use http::{assert_content_type, assert_hx_redirect, get_header};
pub(crate) use multipart::{Part, must_make_multipart};

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

use crate::{
    csv_export::CSV_HEADER,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner},
    navigation::NavBar,
};

fn import_form_view() -> Markup {
    let spinner = loading_spinner();
    let columns = CSV_HEADER.join(", ");

    html! {
        form
            hx-post=(endpoints::IMPORT)
            hx-encoding="multipart/form-data"
            enctype="multipart/form-data"
            hx-disabled-elt="#file, #submit-button"
            hx-indicator="#indicator"
            hx-target="#import-result"
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                label
                    for="file"
                    class="block mb-2 text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Choose a CSV file to upload"
                }

                input
                    id="file"
                    type="file"
                    name="file"
                    accept=".csv,text/csv"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                p class="mt-2 text-sm text-gray-600 dark:text-gray-400"
                {
                    "The file needs a header row with the columns " (columns) ". "
                    "Categories that do not exist yet are created. "
                    "Files downloaded with Export can be imported as is."
                }
            }

            button
                type="submit"
                id="submit-button"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator" { (spinner) }
                " Import"
            }

            div id="import-result" {}
        }
    }
}

fn import_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::IMPORT_VIEW).into_html();
    let form = import_form_view();

    let content = html! {
        (nav_bar)

        div
            class="flex flex-col items-center px-6 py-8 mx-auto lg:py-0
            text-gray-900 dark:text-white"
        {
            div class="relative max-w-md"
            {
                h1 class="text-xl font-bold mb-4" { "Import Expenses" }

                (form)
            }
        }
    };

    base("Import Expenses", &[], &content)
}

/// Route handler for the import CSV page.
pub async fn get_import_page() -> Response {
    import_view().into_response()
}

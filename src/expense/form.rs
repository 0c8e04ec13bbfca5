//! Reading and validating the multipart expense form.

use axum::extract::{Multipart, multipart::Field};
use maud::{Markup, html};
use time::{Date, macros::format_description};

use crate::{
    Error,
    attachment::ALLOWED_EXTENSIONS,
    expense::{EXPENSE_DESCRIPTION_MAX_LENGTH, Expense, ExpenseFields},
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, form_error},
    tag::Tag,
};

/// A file uploaded with the expense form.
#[derive(Debug, Default)]
pub(crate) struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// The raw values of the expense form, used to validate input and to
/// refill the form when there is an error.
#[derive(Debug, Default)]
pub(crate) struct ExpenseForm {
    pub description: String,
    pub amount: String,
    pub date: String,
    pub paid_by: String,
    pub tags: String,
    pub file: Option<UploadedFile>,
}

impl ExpenseForm {
    /// Read the fields of a multipart expense form. Unknown fields are skipped.
    ///
    /// # Errors
    ///
    /// Returns [Error::MultipartError] if the body is not valid multipart data.
    pub(crate) async fn from_multipart(mut multipart: Multipart) -> Result<Self, Error> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(|error| {
            tracing::error!("Could not read multipart field: {error}");
            Error::MultipartError(error.body_text())
        })? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            match name.as_str() {
                "description" => form.description = read_text(field).await?,
                "amount" => form.amount = read_text(field).await?,
                "date" => form.date = read_text(field).await?,
                "paid_by" => form.paid_by = read_text(field).await?,
                "tags" => form.tags = read_text(field).await?,
                "file" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let data = field.bytes().await.map_err(|error| {
                        tracing::error!("Could not read uploaded file: {error}");
                        Error::MultipartError(error.body_text())
                    })?;

                    if !file_name.is_empty() {
                        form.file = Some(UploadedFile {
                            file_name,
                            data: data.to_vec(),
                        });
                    }
                }
                other => tracing::debug!("Ignoring unexpected expense form field \"{other}\""),
            }
        }

        Ok(form)
    }

    /// Check the form values.
    ///
    /// An empty date means `today`. Blank `paid_by` and `tags` become `None`.
    ///
    /// # Errors
    ///
    /// - [Error::EmptyDescription] if the description or amount is blank.
    /// - [Error::TooLong] if the description is too long.
    /// - [Error::InvalidAmount] if the amount is not a number greater than zero.
    /// - [Error::InvalidDate] if the date is not of the form `YYYY-MM-DD`.
    pub(crate) fn validate(&self, today: Date) -> Result<ExpenseFields, Error> {
        let description = self.description.trim();
        let amount = self.amount.trim();

        if description.is_empty() || amount.is_empty() {
            return Err(Error::EmptyDescription);
        }

        if description.chars().count() > EXPENSE_DESCRIPTION_MAX_LENGTH {
            return Err(Error::TooLong {
                field: "Description",
                max: EXPENSE_DESCRIPTION_MAX_LENGTH,
            });
        }

        let amount = match amount.parse::<f64>() {
            Ok(amount) if amount.is_finite() && amount > 0.0 => amount,
            _ => return Err(Error::InvalidAmount),
        };

        let date = parse_date(&self.date, today)?;

        let tags = self
            .tags
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(ExpenseFields {
            description: description.to_owned(),
            amount,
            date,
            paid_by: non_blank(&self.paid_by),
            tags: non_blank(&tags),
        })
    }
}

impl From<&Expense> for ExpenseForm {
    fn from(expense: &Expense) -> Self {
        Self {
            description: expense.description.clone(),
            amount: expense.amount.to_string(),
            date: expense.date.to_string(),
            paid_by: expense.paid_by.clone().unwrap_or_default(),
            tags: expense.tags.clone().unwrap_or_default(),
            file: None,
        }
    }
}

/// Where the expense form is submitted to.
pub(crate) enum ExpenseFormAction<'a> {
    Create { endpoint: &'a str },
    Update { endpoint: &'a str },
}

/// The expense form used on the new and edit expense pages.
///
/// `tags` are offered as suggestions for the tags input and `current_file`
/// is the name of an existing attachment.
pub(crate) fn expense_form_view(
    action: ExpenseFormAction,
    values: &ExpenseForm,
    tags: &[Tag],
    current_file: Option<&str>,
    error_message: &str,
) -> Markup {
    let (hx_post, hx_put, submit_text) = match action {
        ExpenseFormAction::Create { endpoint } => (Some(endpoint), None, "Add Expense"),
        ExpenseFormAction::Update { endpoint } => (None, Some(endpoint), "Update Expense"),
    };
    let accept = ALLOWED_EXTENSIONS
        .iter()
        .map(|extension| format!(".{extension}"))
        .collect::<Vec<_>>()
        .join(",");

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-encoding="multipart/form-data"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full max-w-md space-y-4 md:space-y-6"
        {
            (form_error(error_message))

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    id="description"
                    type="text"
                    name="description"
                    value=(values.description)
                    maxlength=(EXPENSE_DESCRIPTION_MAX_LENGTH)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    id="amount"
                    type="number"
                    name="amount"
                    value=(values.amount)
                    step="0.01"
                    min="0.01"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    id="date"
                    type="date"
                    name="date"
                    value=(values.date)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="paid_by" class=(FORM_LABEL_STYLE) { "Paid By" }

                input
                    id="paid_by"
                    type="text"
                    name="paid_by"
                    value=(values.paid_by)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="tags" class=(FORM_LABEL_STYLE) { "Tags (comma separated)" }

                input
                    id="tags"
                    type="text"
                    name="tags"
                    value=(values.tags)
                    list="tag-suggestions"
                    class=(FORM_TEXT_INPUT_STYLE);

                datalist id="tag-suggestions"
                {
                    @for tag in tags {
                        option value=(tag.name) {}
                    }
                }

                @if !tags.is_empty() {
                    span class="block mt-1 text-xs text-gray-500 dark:text-gray-400"
                    {
                        "Your tags: "
                        (tags.iter().map(|tag| tag.name.as_ref()).collect::<Vec<_>>().join(", "))
                    }
                }
            }

            div
            {
                label for="file" class=(FORM_LABEL_STYLE) { "Receipt" }

                input
                    id="file"
                    type="file"
                    name="file"
                    accept=(accept)
                    class=(FORM_TEXT_INPUT_STYLE);

                @if let Some(current_file) = current_file {
                    span class="block mt-1 text-xs text-gray-500 dark:text-gray-400"
                    {
                        "Current attachment: " (current_file) ". Choose a new file to replace it."
                    }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_text) }
        }
    }
}

/// Parse a `YYYY-MM-DD` date, using `default` for blank input.
pub(crate) fn parse_date(text: &str, default: Date) -> Result<Date, Error> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(default);
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::InvalidDate(text.to_owned()))
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();

    (!text.is_empty()).then(|| text.to_owned())
}

async fn read_text(field: Field<'_>) -> Result<String, Error> {
    field.text().await.map_err(|error| {
        tracing::error!("Could not read multipart text field: {error}");
        Error::MultipartError(error.body_text())
    })
}

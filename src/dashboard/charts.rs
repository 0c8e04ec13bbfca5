//! Chart generation and rendering for the dashboard.
//!
//! This module creates ECharts visualizations of a user's spending:
//! - **Category chart**: Share of all-time spending per category
//! - **Monthly chart**: Spending per month of the selected year
//! - **Yearly chart**: Share of the selected year's spending per category
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Color, ItemStyle, JsFunction,
        Orient, Tooltip, Trigger,
    },
    series::{Pie, bar::Bar},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    category::Category, currency::Currency, endpoints, html::HeadElement,
};

/// Month labels for the x-axis of the monthly chart.
pub(super) const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// The element ID of the monthly chart.
pub(super) const MONTHLY_CHART_ID: &str = "monthly-chart";
/// The element ID of the yearly share chart.
pub(super) const YEARLY_CHART_ID: &str = "yearly-chart";
/// The element ID of the all-time category chart.
pub(super) const CATEGORY_CHART_ID: &str = "category-chart";

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing. The instances are kept in `window.finaCharts`
/// keyed by element ID so that the filter script can update them.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);
                    window.finaCharts[chartDom.id] = chart;

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "window.finaCharts = {{}};\n\
        document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// JavaScript that refreshes the monthly and yearly charts from the metrics
/// endpoint when the year or category filter changes, without a page load.
pub(super) fn filter_script() -> HeadElement {
    let script = format!(
        r#"document.addEventListener('DOMContentLoaded', function() {{
            const form = document.getElementById('chart-filters');
            if (!form) {{ return; }}

            form.addEventListener('change', async function() {{
                const params = new URLSearchParams(new FormData(form));
                const response = await fetch('{metrics}?' + params.toString());
                if (!response.ok) {{ return; }}
                const metrics = await response.json();

                const monthly = window.finaCharts['{monthly}'];
                if (monthly) {{
                    monthly.setOption({{
                        title: {{ text: metrics.category_name, subtext: params.get('year') }},
                        series: [{{ data: metrics.monthly_data, itemStyle: {{ color: metrics.color }} }}]
                    }});
                }}

                const yearly = window.finaCharts['{yearly}'];
                if (yearly) {{
                    yearly.setOption({{
                        title: {{ subtext: params.get('year') }},
                        color: metrics.pie_colors,
                        series: [{{
                            data: metrics.pie_labels.map((name, i) => ({{ name: name, value: metrics.pie_data[i] }}))
                        }}]
                    }});
                }}

                history.replaceState(null, '', '?' + params.toString());
            }});
        }});"#,
        metrics = endpoints::METRICS_API,
        monthly = MONTHLY_CHART_ID,
        yearly = YEARLY_CHART_ID,
    );

    HeadElement::ScriptSource(PreEscaped(script))
}

/// A pie chart of the all-time total of every category that has spending.
pub(super) fn category_chart(category_totals: &[(Category, f64)], currency: Currency) -> Chart {
    let with_spending: Vec<&(Category, f64)> = category_totals
        .iter()
        .filter(|(_, total)| *total > 0.0)
        .collect();

    let colors: Vec<Color> = with_spending
        .iter()
        .map(|(category, _)| Color::from(category.color.as_ref()))
        .collect();
    let data: Vec<(f64, &str)> = with_spending
        .iter()
        .map(|(category, total)| (*total, category.name.as_ref()))
        .collect();

    Chart::new()
        .title(Title::new().text("Spending by Category").subtext("All time"))
        .tooltip(pie_tooltip(currency))
        .legend(Legend::new().orient(Orient::Vertical).left("left").top("15%"))
        .color(colors)
        .series(
            Pie::new()
                .name("Spending")
                .radius(vec!["40%", "70%"])
                .center(vec!["60%", "55%"])
                .data(data),
        )
}

/// A bar chart of the spending in each month of `year`.
///
/// `name` and `color` describe the selected category, or all categories.
pub(super) fn monthly_chart(
    name: &str,
    color: &str,
    monthly_totals: &[f64; 12],
    year: i32,
    currency: Currency,
) -> Chart {
    Chart::new()
        .title(Title::new().text(name).subtext(year.to_string()))
        .tooltip(currency_tooltip(currency))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(70)
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(MONTH_LABELS.to_vec()),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter(currency))),
        )
        .series(
            Bar::new()
                .name("Spent")
                .item_style(ItemStyle::new().color(color))
                .data(monthly_totals.to_vec()),
        )
}

/// A pie chart of each category's share of the spending in `year`.
pub(super) fn yearly_chart(
    yearly_totals: &[(Category, f64)],
    year: i32,
    currency: Currency,
) -> Chart {
    let colors: Vec<Color> = yearly_totals
        .iter()
        .map(|(category, _)| Color::from(category.color.as_ref()))
        .collect();
    let data: Vec<(f64, &str)> = yearly_totals
        .iter()
        .map(|(category, total)| (*total, category.name.as_ref()))
        .collect();

    Chart::new()
        .title(Title::new().text("Yearly Share").subtext(year.to_string()))
        .tooltip(pie_tooltip(currency))
        .legend(Legend::new().orient(Orient::Vertical).left("left").top("15%"))
        .color(colors)
        .series(
            Pie::new()
                .name("Spending")
                .radius("65%")
                .center(vec!["60%", "55%"])
                .data(data),
        )
}

#[inline]
fn currency_formatter(currency: Currency) -> JsFunction {
    JsFunction::new_with_args(
        "number",
        &format!(
            "const currencyFormatter = new Intl.NumberFormat('en-US', {{
                  style: 'currency',
                  currency: '{}'
                }});
                return (number) ? currencyFormatter.format(number) : \"-\";",
            currency.code()
        ),
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip(currency: Currency) -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter(currency))
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

fn pie_tooltip(currency: Currency) -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Item)
        .value_formatter(currency_formatter(currency))
}

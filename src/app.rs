use leptos::ev::SubmitEvent;
use leptos::logging::{error, log};
use leptos::prelude::*;
use leptos::server_fn::error::NoCustomError;
use leptos::task::spawn_local;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    hooks::{use_navigate, use_params_map},
    path, NavigateOptions,
};

use crate::fetch::{
    fetch_event_records, gate, FetchError, FetchTracker, GateDecision, SessionStatus,
    WebsitesPayload, SIGN_IN_PATH,
};
use crate::model::SubmissionRecord;
use crate::submissions::{
    display_status, filter_with_index, non_empty, status_color, EmailStatusIndex, FilterMode,
};
#[cfg(feature = "ssr")]
use crate::{create_admin_session, delete_admin_session, get_event_codes, validate_admin_token};

#[cfg(feature = "ssr")]
use diesel::r2d2::{ConnectionManager, Pool};
#[cfg(feature = "ssr")]
use diesel::SqliteConnection;
#[cfg(feature = "ssr")]
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[cfg(feature = "ssr")]
async fn extract_and_validate_admin_token(
    pool: DbPool,
) -> Result<Option<bool>, ServerFnError<NoCustomError>> {
    use axum::http::HeaderMap;
    use leptos_axum::extract;

    let headers: HeaderMap = extract()
        .await
        .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?;
    let admin_token = crate::api::cookie_value(&headers, crate::api::ADMIN_COOKIE);

    let result = tokio::task::spawn_blocking(
        move || -> Result<Option<bool>, ServerFnError<NoCustomError>> {
            let mut conn = pool
                .get()
                .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?;
            match admin_token {
                Some(t) => {
                    let is_valid = validate_admin_token(&mut conn, &t)
                        .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?;
                    Ok(Some(is_valid))
                }
                None => Ok(None),
            }
        },
    )
    .await;

    match result {
        Ok(validity) => validity,
        Err(e) => Err(ServerFnError::ServerError(e.to_string())),
    }
}

// Checks if the current request is from an admin. Returns true if it is, false otherwise.
#[server(IsAdmin)]
pub async fn is_admin() -> Result<bool, ServerFnError<NoCustomError>> {
    let pool: DbPool = expect_context();
    let validity = extract_and_validate_admin_token(pool).await?;
    Ok(validity.unwrap_or(false)) // None -> false
}

// Returns an empty result if the current request is from an admin, or an error otherwise.
#[cfg(feature = "ssr")]
async fn check_admin() -> Result<(), ServerFnError<NoCustomError>> {
    let pool: DbPool = expect_context();
    let validity = extract_and_validate_admin_token(pool).await?;
    match validity {
        Some(true) => Ok(()),
        _ => Err(ServerFnError::ServerError("Unauthorized".to_string())),
    }
}

#[server(AdminLogin)]
pub async fn admin_login(password: String) -> Result<(), ServerFnError<NoCustomError>> {
    let pool: DbPool = expect_context();
    let admin_password = std::env::var("ADMIN_PASSWORD").map_err(|_| {
        ServerFnError::<NoCustomError>::ServerError("Admin password not set".to_string())
    })?;

    if password != admin_password {
        log!("Rejected admin login attempt");
        return Err(ServerFnError::ServerError("Invalid password".to_string()));
    }

    let token = tokio::task::spawn_blocking(
        move || -> Result<String, ServerFnError<NoCustomError>> {
            let mut conn = pool
                .get()
                .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?;
            create_admin_session(&mut conn).map_err(|e| ServerFnError::ServerError(e.to_string()))
        },
    )
    .await
    .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))??;

    use leptos_axum::ResponseOptions;
    let resp: ResponseOptions = expect_context();
    let cookie = crate::api::admin_cookie(Some(&token));
    resp.insert_header(
        axum::http::header::SET_COOKIE,
        axum::http::HeaderValue::from_str(&cookie)
            .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?,
    );

    Ok(())
}

#[server(AdminLogout)]
pub async fn admin_logout() -> Result<(), ServerFnError<NoCustomError>> {
    use axum::http::HeaderMap;
    use leptos_axum::{extract, ResponseOptions};

    // Drop the server-side session too.
    let headers: HeaderMap = extract()
        .await
        .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?;
    if let Some(token) = crate::api::cookie_value(&headers, crate::api::ADMIN_COOKIE) {
        let pool: DbPool = expect_context();
        tokio::task::spawn_blocking(move || -> Result<(), ServerFnError<NoCustomError>> {
            let mut conn = pool
                .get()
                .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?;
            delete_admin_session(&mut conn, &token)
                .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))??;
    }

    let resp: ResponseOptions = expect_context();
    let cookie = crate::api::admin_cookie(None);
    resp.insert_header(
        axum::http::header::SET_COOKIE,
        axum::http::HeaderValue::from_str(&cookie)
            .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?,
    );
    Ok(())
}

#[server(ListEventCodes)]
pub async fn list_event_codes() -> Result<Vec<String>, ServerFnError<NoCustomError>> {
    check_admin().await?;

    let pool: DbPool = expect_context();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?;
        get_event_codes(&mut conn)
            .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))
    })
    .await
    .map_err(|e| ServerFnError::<NoCustomError>::ServerError(e.to_string()))?
}

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    view! {
        // id=leptos means cargo-leptos will hot-reload this stylesheet
        <Stylesheet id="leptos" href="/pkg/event-submissions.css" />

        <Title text="Event Submissions" />

        <Router>
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=path!("/") view=EventIndex />
                    <Route path=path!("/signin") view=SignIn />
                    <Route path=path!("/event/:event_code") view=EventPage />
                </Routes>
            </main>
        </Router>
    }
}

/// What the submissions table body shows, in priority order.
#[derive(Debug, Clone, PartialEq)]
enum TableContent {
    Loading,
    Error(String),
    Empty,
    Rows(Vec<SubmissionRecord>),
}

fn table_content(loading: bool, error: &str, rows: Vec<SubmissionRecord>) -> TableContent {
    if loading {
        TableContent::Loading
    } else if !error.is_empty() {
        TableContent::Error(error.to_string())
    } else if rows.is_empty() {
        TableContent::Empty
    } else {
        TableContent::Rows(rows)
    }
}

/// The page state left behind by one finished fetch. A failure clears the previous event's
/// rows and raw payload.
#[derive(Debug, Clone, PartialEq)]
struct LoadedEvent {
    records: Vec<SubmissionRecord>,
    raw: Option<serde_json::Value>,
    error: String,
}

impl From<Result<WebsitesPayload, FetchError>> for LoadedEvent {
    fn from(result: Result<WebsitesPayload, FetchError>) -> Self {
        match result {
            Ok(payload) => LoadedEvent {
                records: payload.records,
                raw: Some(payload.raw),
                error: String::new(),
            },
            Err(e) => LoadedEvent {
                records: Vec::new(),
                raw: None,
                error: e.to_string(),
            },
        }
    }
}

fn website_cell(website: Option<String>) -> AnyView {
    match website {
        Some(url) => {
            let href = url.clone();
            view! {
                <a href=href target="_blank" rel="noreferrer">
                    {url}
                </a>
            }
            .into_any()
        }
        None => view! { "—" }.into_any(),
    }
}

fn replace_options() -> NavigateOptions {
    NavigateOptions {
        replace: true,
        ..Default::default()
    }
}

#[component]
fn SignIn() -> impl IntoView {
    let password = RwSignal::new(String::new());
    let error = RwSignal::new(String::new());

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let p = password.get();
        if p.is_empty() {
            error.set("Please enter password.".to_string());
            return;
        }
        spawn_local(async move {
            match admin_login(p).await {
                Ok(_) => {
                    error.set(String::new());
                    let navigate = use_navigate();
                    navigate("/", NavigateOptions::default());
                }
                Err(e) => error.set(e.to_string()),
            }
        });
    };

    view! {
        <div>
            <h1>"Sign In"</h1>
            <form on:submit=submit>
                <label>
                    "Password: "
                    <input
                        type="password"
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                </label>
                <button type="submit">"Sign in"</button>
            </form>
            {move || (!error.get().is_empty()).then(|| view! { <p class="error">{error.get()}</p> })}
        </div>
    }
}

#[component]
fn EventIndex() -> impl IntoView {
    let is_admin_fetcher = Resource::new(|| (), |_| is_admin());
    let event_codes_fetcher = Resource::new(|| (), |_| list_event_codes());

    let navigate = use_navigate();
    Effect::new(move || {
        is_admin_fetcher.with(|check| {
            if gate(SessionStatus::from_check(check.as_ref()), None) == GateDecision::Redirect {
                navigate(SIGN_IN_PATH, replace_options());
            }
        });
    });

    view! {
        <Suspense fallback=|| ()>
            {move || {
                if let Some(Ok(true)) = is_admin_fetcher.get() {
                    view! {
                        <div class="admin-container">
                            <h1>"Events"</h1>
                            <Suspense fallback=|| view! { <p>"Loading..."</p> }>
                                {move || {
                                    event_codes_fetcher
                                        .with(|maybe_result| match maybe_result {
                                            Some(Ok(codes)) if codes.is_empty() => {
                                                view! { <p>"No events have submissions yet."</p> }
                                                    .into_any()
                                            }
                                            Some(Ok(codes)) => {
                                                view! {
                                                    <ul class="event-list">
                                                        {codes
                                                            .iter()
                                                            .map(|code| {
                                                                let href = format!(
                                                                    "/event/{}",
                                                                    urlencoding::encode(code),
                                                                );
                                                                view! {
                                                                    <li>
                                                                        <a href=href>{code.clone()}</a>
                                                                    </li>
                                                                }
                                                            })
                                                            .collect_view()}
                                                    </ul>
                                                }
                                                    .into_any()
                                            }
                                            Some(Err(e)) => {
                                                view! { <p class="error">{e.to_string()}</p> }
                                                    .into_any()
                                            }
                                            None => view! { <p>"Loading..."</p> }.into_any(),
                                        })
                                }}
                            </Suspense>
                        </div>
                    }
                        .into_any()
                } else {
                    view! {}.into_any()
                }
            }}
        </Suspense>
    }
}

#[component]
fn EventPage() -> impl IntoView {
    let params = use_params_map();
    let event_code = move || params.with(|p| p.get("event_code"));

    let is_admin_fetcher = Resource::new(|| (), |_| is_admin());
    let session = move || is_admin_fetcher.with(|check| SessionStatus::from_check(check.as_ref()));

    let records = RwSignal::new(Vec::<SubmissionRecord>::new());
    let raw_response = RwSignal::new(None::<serde_json::Value>);
    let loading = RwSignal::new(true);
    let error_message = RwSignal::new(String::new());
    let status_filter = RwSignal::new(FilterMode::default());
    let tracker = StoredValue::new(FetchTracker::default());

    // Redirects once the session is known to be missing, and (re)fetches whenever the session
    // resolves or the event code changes. Responses for superseded requests are dropped.
    let navigate = use_navigate();
    Effect::new(move || match gate(session(), event_code().as_deref()) {
        GateDecision::Wait => {}
        GateDecision::Redirect => navigate(SIGN_IN_PATH, replace_options()),
        GateDecision::Fetch(code) => {
            let Some(ticket) = tracker.try_update_value(|t| t.begin(&code)) else {
                return;
            };
            loading.set(true);
            error_message.set(String::new());
            raw_response.set(None);
            spawn_local(async move {
                let result = fetch_event_records(ticket.event_code()).await;
                if !tracker.with_value(|t| t.is_current(&ticket)) {
                    log!("Discarding stale response for event {}", ticket.event_code());
                    return;
                }
                if let Err(e) = &result {
                    error!("Error fetching event data: {}", e);
                }
                let loaded = LoadedEvent::from(result);
                raw_response.set(loaded.raw);
                records.set(loaded.records);
                error_message.set(loaded.error);
                loading.set(false);
            });
        }
    });

    let status_index = Memo::new(move |_| records.with(|rows| EmailStatusIndex::build(rows)));
    let filtered_rows = Memo::new(move |_| {
        let mode = status_filter.get();
        records.with(|rows| status_index.with(|index| filter_with_index(rows, index, mode)))
    });

    let logout = move |_| {
        spawn_local(async move {
            if let Err(e) = admin_logout().await {
                error!("Logout failed: {}", e);
            }
            let navigate = use_navigate();
            navigate(SIGN_IN_PATH, NavigateOptions::default());
        });
    };

    let table_body = move || match table_content(
        loading.get(),
        &error_message.get(),
        filtered_rows.get(),
    ) {
        TableContent::Loading => view! {
            <tr>
                <td colspan="5">"Loading..."</td>
            </tr>
        }
        .into_any(),
        TableContent::Error(message) => view! {
            <tr>
                <td colspan="5" class="error">{message}</td>
            </tr>
        }
        .into_any(),
        TableContent::Empty => view! {
            <tr>
                <td colspan="5">"No records match this filter."</td>
            </tr>
        }
        .into_any(),
        TableContent::Rows(rows) => rows
            .into_iter()
            .map(|row| {
                let color = status_color(&row);
                let status = display_status(&row).to_string();
                let website = non_empty(row.website.as_deref()).map(str::to_string);
                let reason = non_empty(row.decision_reason.as_deref())
                    .unwrap_or("—")
                    .to_string();
                view! {
                    <tr>
                        <td>{row.name}</td>
                        <td>{row.email.unwrap_or_default()}</td>
                        <td style:font-weight="600" style:color=color>{status}</td>
                        <td>{website_cell(website)}</td>
                        <td>{reason}</td>
                    </tr>
                }
            })
            .collect_view()
            .into_any(),
    };

    view! {
        <Suspense fallback=|| ()>
            {move || {
                if session() != SessionStatus::Authenticated {
                    return view! {}.into_any();
                }
                view! {
                    <div class="admin-container">
                        <header class="admin-header">
                            <p>"Event Code: " <strong>{move || event_code().unwrap_or_default()}</strong></p>
                            <div class="status-filter">
                                <label for="status-filter">"Status filter:"</label>
                                <select
                                    id="status-filter"
                                    class="form-select"
                                    prop:value=move || status_filter.get().as_str()
                                    on:change=move |ev| {
                                        status_filter
                                            .set(event_target_value(&ev).parse().unwrap_or_default())
                                    }
                                >
                                    {FilterMode::ALL
                                        .into_iter()
                                        .map(|mode| {
                                            view! { <option value=mode.as_str()>{mode.label()}</option> }
                                        })
                                        .collect_view()}
                                </select>
                            </div>
                            <button class="btn-logout" on:click=logout>
                                "Logout"
                            </button>
                        </header>

                        <div class="table-responsive">
                            <table class="admin-table">
                                <thead>
                                    <tr>
                                        <th>"Name"</th>
                                        <th>"Email"</th>
                                        <th>"Status"</th>
                                        <th>"Website"</th>
                                        <th>"Decision Reason"</th>
                                    </tr>
                                </thead>
                                <tbody>{table_body}</tbody>
                            </table>
                        </div>

                        {move || {
                            raw_response
                                .get()
                                .map(|raw| {
                                    view! {
                                        <details class="raw-response">
                                            <summary>"Raw response"</summary>
                                            <pre>
                                                {serde_json::to_string_pretty(&raw).unwrap_or_default()}
                                            </pre>
                                        </details>
                                    }
                                })
                        }}
                    </div>
                }
                    .into_any()
            }}
        </Suspense>
    }
}

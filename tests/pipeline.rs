use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sluice::{
    Context, Error, Flow, Method, MethodFilter, MiddlewareDeclaration, PipelineTable, Request,
    Response, RouteDeclaration, Router, StatusCode,
};

type Log = Arc<Mutex<Vec<&'static str>>>;

/// A middleware that records `name` and continues.
fn mark(log: &Log, name: &'static str) -> impl Fn(Context) -> std::future::Ready<Flow> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |cx| {
        log.lock().unwrap().push(name);
        std::future::ready(Flow::Continue(cx))
    }
}

/// A route handler that records `name` and answers with it.
fn answer(log: &Log, name: &'static str) -> impl Fn(Context) -> std::future::Ready<Response> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |_| {
        log.lock().unwrap().push(name);
        std::future::ready(Response::text(name))
    }
}

fn entries(log: &Log) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

async fn dispatch(table: &PipelineTable, method: Method, path: &str, req: Request) -> Response {
    table.get(path, method)
        .expect("route compiled")
        .run(req)
        .await
        .expect("pipeline succeeded")
}

#[tokio::test]
async fn empty_stack_behaves_like_calling_the_handler() {
    async fn hello(cx: Context) -> Response {
        cx.json(&serde_json::json!({ "path": cx.request().path(), "data": cx.data().len() }))
    }

    let table = Router::new()
        .middleware(Method::Post, "/hello", mark(&Log::default(), "unused"))
        .get("/hello", hello)
        .compile();
    let pipeline = table.get("/hello", Method::Get).unwrap();
    assert_eq!(pipeline.depth(), 0);

    let via_pipeline = pipeline.run(Request::new(Method::Get, "/hello")).await.unwrap();
    let direct = hello(Context::new(Request::new(Method::Get, "/hello"))).await;

    assert_eq!(via_pipeline.status_code(), direct.status_code());
    assert_eq!(via_pipeline.headers(), direct.headers());
    assert_eq!(via_pipeline.body(), direct.body());
}

#[tokio::test]
async fn wildcards_reach_every_route() {
    let log = Log::default();
    let table = Router::new()
        .middleware(MethodFilter::Only(Method::Delete), "*", mark(&log, "any-path"))
        .middleware(MethodFilter::Any, "/x", mark(&log, "any-method"))
        .delete("/x", answer(&log, "h"))
        .delete("/deep/nested/route", answer(&log, "h"))
        .get("/x", answer(&log, "h"))
        .compile();

    assert_eq!(table.get("/x", Method::Delete).unwrap().depth(), 2);
    assert_eq!(table.get("/deep/nested/route", Method::Delete).unwrap().depth(), 1);
    assert_eq!(table.get("/x", Method::Get).unwrap().depth(), 1);
}

#[tokio::test]
async fn prefix_scope_respects_segment_boundaries() {
    let log = Log::default();
    let table = Router::new()
        .middleware(MethodFilter::Any, "/api", mark(&log, "api"))
        .get("/api/users", answer(&log, "users"))
        .get("/apiv2", answer(&log, "v2"))
        .compile();

    dispatch(&table, Method::Get, "/api/users", Request::new(Method::Get, "/api/users")).await;
    dispatch(&table, Method::Get, "/apiv2", Request::new(Method::Get, "/apiv2")).await;

    assert_eq!(entries(&log), ["api", "users", "v2"]);
}

#[tokio::test]
async fn middleware_runs_in_declaration_order() {
    let log = Log::default();
    let table = Router::new()
        .middleware(MethodFilter::Any, "/orders", mark(&log, "m1"))
        .middleware(MethodFilter::Any, "*", mark(&log, "m2"))
        .middleware(Method::Get, "/orders", mark(&log, "m3"))
        .get("/orders", answer(&log, "handler"))
        .compile();

    dispatch(&table, Method::Get, "/orders", Request::new(Method::Get, "/orders")).await;
    assert_eq!(entries(&log), ["m1", "m2", "m3", "handler"]);
}

#[tokio::test]
async fn short_circuit_skips_the_rest_and_returns_that_response() {
    let log = Log::default();
    let gate = {
        let log = Arc::clone(&log);
        move |_: Context| {
            log.lock().unwrap().push("gate");
            async {
                Flow::Respond(
                    Response::builder()
                        .status(StatusCode::SERVICE_UNAVAILABLE)
                        .header("retry-after", "30")
                        .text("maintenance"),
                )
            }
        }
    };

    let table = Router::new()
        .middleware(MethodFilter::Any, "*", mark(&log, "before"))
        .middleware(MethodFilter::Any, "*", gate)
        .middleware(MethodFilter::Any, "*", mark(&log, "after"))
        .get("/", answer(&log, "handler"))
        .compile();

    let res = dispatch(&table, Method::Get, "/", Request::new(Method::Get, "/")).await;

    assert_eq!(entries(&log), ["before", "gate"]);
    assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.header("retry-after"), Some("30"));
    assert_eq!(res.body(), b"maintenance");
}

#[tokio::test]
async fn compiling_twice_dispatches_identically() {
    let log = Log::default();
    let router = Router::new()
        .middleware(MethodFilter::Any, "*", mark(&log, "log"))
        .middleware(Method::Post, "/a", mark(&log, "post-a"))
        .get("/a", answer(&log, "get-a"))
        .post("/a", answer(&log, "post-a-handler"))
        .get("/b", answer(&log, "get-b"));

    let first = router.compile();
    let second = router.compile();
    assert_eq!(first.len(), second.len());

    for (path, method) in [("/a", Method::Get), ("/a", Method::Post), ("/b", Method::Get)] {
        let a = first.get(path, method).unwrap();
        let b = second.get(path, method).unwrap();
        assert_eq!(a.depth(), b.depth());

        log.lock().unwrap().clear();
        let ra = a.run(Request::new(method, path)).await.unwrap();
        let run_a = entries(&log);

        log.lock().unwrap().clear();
        let rb = b.run(Request::new(method, path)).await.unwrap();
        let run_b = entries(&log);

        assert_eq!(run_a, run_b);
        assert_eq!(ra.body(), rb.body());
    }
}

#[tokio::test]
async fn data_written_by_middleware_reaches_the_handler_only_for_that_request() {
    async fn stamp(mut cx: Context) -> Flow {
        let seen_before = cx.data().contains_key("user");
        cx.data_mut().insert("user", "ana");
        cx.data_mut().insert("seen_before", seen_before);
        Flow::Continue(cx)
    }

    async fn whoami(cx: Context) -> String {
        format!(
            "{} {}",
            cx.data().get_as::<String>("user").unwrap_or_default(),
            cx.data().get_as::<bool>("seen_before").unwrap_or(true),
        )
    }

    let table = Router::new()
        .middleware(MethodFilter::Any, "*", stamp)
        .get("/me", whoami)
        .compile();

    for _ in 0..2 {
        let res = dispatch(&table, Method::Get, "/me", Request::new(Method::Get, "/me")).await;
        assert_eq!(res.body(), b"ana false");
    }
}

#[tokio::test]
async fn errors_propagate_and_stop_the_pipeline() {
    let log = Log::default();
    let table = Router::new()
        .middleware(MethodFilter::Any, "*", |_: Context| async {
            Err::<Flow, _>("token store offline")
        })
        .get("/", answer(&log, "handler"))
        .compile();

    let err = table.get("/", Method::Get).unwrap()
        .run(Request::new(Method::Get, "/"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Handler(_)));
    assert_eq!(err.to_string(), "handler: token store offline");
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn declarations_can_be_built_without_the_router() {
    let log = Log::default();
    let routes = vec![
        RouteDeclaration::new(Method::Put, "/k", answer(&log, "old")),
        RouteDeclaration::new(Method::Put, "/k", answer(&log, "new")),
    ];
    let middlewares = vec![MiddlewareDeclaration::new(MethodFilter::Any, "/k", mark(&log, "m"))];

    assert_eq!(sluice::duplicates(&routes), vec![("/k".to_owned(), Method::Put)]);

    let table = PipelineTable::compile(&routes, &middlewares);
    let res = dispatch(&table, Method::Put, "/k", Request::new(Method::Put, "/k")).await;
    assert_eq!(res.body(), b"new");
    assert_eq!(entries(&log), ["m", "new"]);
}

#[tokio::test]
async fn router_picks_up_declarations_built_elsewhere() {
    let log = Log::default();
    let routes = vec![RouteDeclaration::new(Method::Get, "/k", answer(&log, "h"))];
    let middlewares = vec![MiddlewareDeclaration::new(MethodFilter::Any, "*", mark(&log, "shared"))];

    let table = Router::from_declarations(routes, middlewares)
        .middleware(Method::Get, "/k", mark(&log, "local"))
        .post("/k", answer(&log, "post"))
        .compile();

    assert_eq!(table.len(), 2);
    dispatch(&table, Method::Get, "/k", Request::new(Method::Get, "/k")).await;
    assert_eq!(entries(&log), ["shared", "local", "h"]);
}

#[tokio::test]
async fn wrap_covers_every_method_and_path_in_declaration_order() {
    let log = Log::default();
    let table = Router::new()
        .middleware(Method::Delete, "/a", mark(&log, "first"))
        .wrap(mark(&log, "wrapped"))
        .delete("/a", answer(&log, "a"))
        .patch("/b/c", answer(&log, "bc"))
        .compile();

    assert_eq!(table.get("/a", Method::Delete).unwrap().depth(), 2);
    assert_eq!(table.get("/b/c", Method::Patch).unwrap().depth(), 1);

    dispatch(&table, Method::Delete, "/a", Request::new(Method::Delete, "/a")).await;
    dispatch(&table, Method::Patch, "/b/c", Request::new(Method::Patch, "/b/c")).await;
    assert_eq!(entries(&log), ["first", "wrapped", "a", "wrapped", "bc"]);
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn auth_middleware_rejects_then_admits() {
    let log = Log::default();
    let auth = {
        let log = Arc::clone(&log);
        move |cx: Context| {
            log.lock().unwrap().push("mAuth");
            async move {
                if cx.request().header("authorization").is_some() {
                    Flow::Continue(cx)
                } else {
                    Flow::Respond(Response::status(StatusCode::UNAUTHORIZED))
                }
            }
        }
    };

    let table = Router::new()
        .middleware(MethodFilter::Any, "*", mark(&log, "mLog"))
        .middleware(Method::Get, "/users", auth)
        .get("/users", answer(&log, "h1"))
        .compile();

    let res = dispatch(&table, Method::Get, "/users", Request::new(Method::Get, "/users")).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(entries(&log), ["mLog", "mAuth"]);

    log.lock().unwrap().clear();
    let authed = Request::new(Method::Get, "/users").with_header("Authorization", "Bearer abc");
    let res = dispatch(&table, Method::Get, "/users", authed).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.body(), b"h1");
    assert_eq!(entries(&log), ["mLog", "mAuth", "h1"]);
}

#[tokio::test]
async fn counting_middleware_runs_once_per_request() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);

    async fn h2(cx: Context) -> Response {
        cx.json(&serde_json::json!({ "created": true }))
    }

    let table = Router::new()
        .middleware(MethodFilter::Any, "/items", move |cx: Context| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Flow::Continue(cx) }
        })
        .post("/items", h2)
        .compile();

    for _ in 0..2 {
        let res = dispatch(&table, Method::Post, "/items", Request::new(Method::Post, "/items")).await;
        assert_eq!(res.body(), br#"{"created":true}"#);
    }
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_requests_do_not_share_context() {
    async fn slow_stamp(mut cx: Context) -> Flow {
        let id = cx.request().header("x-id").unwrap_or_default().to_owned();
        tokio::task::yield_now().await;
        cx.data_mut().insert("id", id);
        Flow::Continue(cx)
    }

    async fn echo_id(cx: Context) -> String {
        cx.data().get_as::<String>("id").unwrap_or_default()
    }

    let table = Arc::new(
        Router::new()
            .middleware(MethodFilter::Any, "*", slow_stamp)
            .get("/id", echo_id)
            .compile(),
    );

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let table = Arc::clone(&table);
        tasks.spawn(async move {
            let req = Request::new(Method::Get, "/id").with_header("x-id", i.to_string());
            let res = table.get("/id", Method::Get).unwrap().run(req).await.unwrap();
            (i, String::from_utf8(res.body().to_vec()).unwrap())
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (i, body) = joined.unwrap();
        assert_eq!(body, i.to_string());
    }
}

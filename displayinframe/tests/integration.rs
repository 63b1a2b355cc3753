use std::sync::Arc;

use displayinframe::host::{AccessRules, MemoryWiki, RenderRequest, Wiki};
use displayinframe::{Execution, InclusionError, MacroContext};
use wiki::render::{to_html, to_plain_text};
use wiki::{Block, MetaData, Parameters, UserReference, Xdom};

fn wiki_with(pages: &[(&str, &str)], rules: AccessRules) -> Wiki {
    let mut store = MemoryWiki::new();
    for (reference, content) in pages {
        store.insert(reference.parse().expect("bad test reference"), *content);
    }
    Wiki::new("xwiki", Arc::new(store), Arc::new(rules))
}

fn wiki(pages: &[(&str, &str)]) -> Wiki {
    wiki_with(pages, AccessRules::allow_all())
}

fn render(wiki: &Wiki, page: &str, request: &RenderRequest) -> Xdom {
    let reference = wiki.resolve(page).expect("resolve failed");
    wiki.render_page(&reference, request).expect("render failed")
}

fn plain(wiki: &Wiki, page: &str) -> String {
    to_plain_text(&render(wiki, page, &RenderRequest::default()).children)
}

fn html(wiki: &Wiki, page: &str) -> String {
    to_html(&render(wiki, page, &RenderRequest::default()).children)
}

fn as_user(user: &str) -> RenderRequest {
    RenderRequest {
        user: UserReference::new(user),
        ..RenderRequest::default()
    }
}

const CALL_FAILED: &str = "[error] Failed to execute the [displayinframe] macro. Cause: ";

#[test]
fn displays_page_between_surrounding_content() {
    let wiki = wiki(&[
        ("xwiki:Main.A", "before\n\n{{displayinframe reference=\"Main.B\"/}}\n\nafter"),
        ("xwiki:Main.B", "# Title\nbody"),
    ]);
    assert_eq!(plain(&wiki, "Main.A"), "before\n\nTitle\n\nbody\n\nafter");
}

#[test]
fn frame_links_back_to_source() {
    let wiki = wiki(&[
        ("xwiki:Main.A", "{{displayinframe reference=\"B\"/}}"),
        ("xwiki:Main.B", "hello"),
    ]);
    assert_eq!(
        html(&wiki, "Main.A"),
        "<div class=\"DisplayInFrame\" href=\"/bin/view/Main/B\" source=\"xwiki:Main.B\"><p>hello</p></div>"
    );
}

#[test]
fn page_parameter_targets_nested_pages() {
    let wiki = wiki(&[
        ("xwiki:Main.A", "{{displayinframe page=\"Docs/Guide\"/}}"),
        ("xwiki:Docs.Guide.WebHome", "guide"),
    ]);
    let out = html(&wiki, "Main.A");
    assert!(out.contains("href=\"/bin/view/Docs/Guide/WebHome\""), "{}", out);
    assert!(out.contains("<p>guide</p>"));
}

#[test]
fn excludes_first_heading_on_request() {
    let render_with = |flag: &str| {
        let source = format!(
            "{{{{displayinframe reference=\"B\" excludeFirstHeading=\"{}\"/}}}}",
            flag
        );
        let wiki = wiki(&[
            ("xwiki:Main.A", source.as_str()),
            ("xwiki:Main.B", "# Title\nbody\n## Sub\nmore"),
        ]);
        plain(&wiki, "Main.A")
    };
    assert_eq!(render_with("true"), "body\n\nSub\n\nmore");
    assert_eq!(render_with("false"), "Title\n\nbody\n\nSub\n\nmore");
}

#[test]
fn self_display_is_rejected_immediately() {
    let wiki = wiki(&[("xwiki:Main.A", "a\n\n{{displayinframe reference=\"A\"/}}")]);
    assert_eq!(
        plain(&wiki, "Main.A"),
        format!(
            "a\n\n{}[Found recursive display of document [xwiki:Main.A]]",
            CALL_FAILED
        )
    );
}

#[test]
fn transitive_recursion_names_the_repeated_page() {
    let wiki = wiki(&[
        ("xwiki:Main.A", "a\n\n{{displayinframe reference=\"B\"/}}"),
        ("xwiki:Main.B", "b\n\n{{displayinframe reference=\"A\"/}}"),
    ]);
    assert_eq!(
        plain(&wiki, "Main.A"),
        format!(
            "a\n\nb\n\n{}[Found recursive display of document [xwiki:Main.A]]",
            CALL_FAILED
        )
    );
}

#[test]
fn macro_fails_when_document_is_already_displayed() {
    let wiki = wiki(&[("xwiki:Main.A", "a")]);
    let a = wiki.resolve("Main.A").unwrap();
    let execution = Execution::new(UserReference::guest()).with_document(a.clone());
    let _outer = execution.inclusions().enter(&a).unwrap();

    let display = wiki.transformation().get("displayinframe").expect("macro registered");
    let mut parameters = Parameters::new();
    parameters.insert("reference".into(), "A".into());
    let err = display
        .execute(&parameters, None, &MacroContext::new(execution.clone()))
        .unwrap_err();

    assert!(matches!(err.inclusion(), Some(InclusionError::Recursion(r)) if r == "xwiki:Main.A"));
    assert_eq!(err.to_string(), "Found recursive display of document [xwiki:Main.A]");
    assert_eq!(execution.inclusions().depth(), 1);
}

#[test]
fn sibling_displays_of_one_page_both_succeed() {
    let wiki = wiki(&[
        (
            "xwiki:Main.A",
            "{{displayinframe reference=\"B\"/}}\n{{displayinframe reference=\"B\"/}}",
        ),
        ("xwiki:Main.B", "b"),
    ]);
    assert_eq!(plain(&wiki, "Main.A"), "b\n\nb");
}

#[test]
fn failed_display_releases_its_guard() {
    let wiki = wiki(&[(
        "xwiki:Main.A",
        "{{displayinframe reference=\"Nope\"/}}\n{{displayinframe reference=\"Nope\"/}}",
    )]);
    let expected = format!("{}[Failed to load Document [xwiki:Main.Nope]]", CALL_FAILED);
    assert_eq!(plain(&wiki, "Main.A"), format!("{}\n\n{}", expected, expected));
}

#[test]
fn failed_render_releases_its_guard() {
    let wiki = wiki(&[
        (
            "xwiki:Main.A",
            "{{displayinframe reference=\"B\" section=\"HNope\"/}}\n{{displayinframe reference=\"B\"/}}",
        ),
        ("xwiki:Main.B", "# One\nb"),
    ]);
    assert_eq!(
        plain(&wiki, "Main.A"),
        format!(
            "{}[Cannot find section [HNope] in document [xwiki:Main.B]]\n\nOne\n\nb",
            CALL_FAILED
        )
    );
}

#[test]
fn denied_page_shows_nothing_of_its_content() {
    let rules = AccessRules::allow_all()
        .allow(Some("XWiki.Admin"), "Main.Secret")
        .deny(None, "Main.Secret");
    let wiki = wiki_with(
        &[
            ("xwiki:Main.A", "{{displayinframe reference=\"Secret\"/}}"),
            ("xwiki:Main.Secret", "# Hidden\nsecret text"),
        ],
        rules,
    );

    let guest = to_plain_text(&render(&wiki, "Main.A", &RenderRequest::default()).children);
    assert_eq!(
        guest,
        format!(
            "{}[Current user [XWiki.XWikiGuest] doesn't have view rights on document [xwiki:Main.Secret]]",
            CALL_FAILED
        )
    );
    assert!(!guest.contains("secret text"));

    let admin = to_plain_text(&render(&wiki, "Main.A", &as_user("XWiki.Admin")).children);
    assert_eq!(admin, "Hidden\n\nsecret text");
}

#[test]
fn top_level_page_needs_view_rights() {
    let wiki = wiki_with(&[("xwiki:Main.A", "a")], AccessRules::allow_all().deny(None, "*"));
    let reference = wiki.resolve("Main.A").unwrap();
    let err = wiki.render_page(&reference, &RenderRequest::default()).unwrap_err();
    assert!(matches!(err, InclusionError::Permission { .. }));
}

#[test]
fn frame_records_provenance_for_nested_resolution() {
    let wiki = wiki(&[
        ("xwiki:Main.A", "{{displayinframe reference=\"Other.B\"/}}"),
        ("xwiki:Other.B", "{{displayinframe reference=\"C\"/}}"),
        ("xwiki:Other.C", "c"),
    ]);
    let xdom = render(&wiki, "Main.A", &RenderRequest::default());

    let Block::MetaData { metadata, .. } = &xdom.children[0] else {
        panic!("expected a metadata block, got {:?}", xdom.children[0]);
    };
    assert_eq!(metadata.get(MetaData::SOURCE), Some("xwiki:Other.B"));
    assert_eq!(metadata.get(MetaData::BASE), Some("xwiki:Other.B"));
    assert_eq!(to_plain_text(&xdom.children), "c");
}

#[test]
fn section_parameter_limits_display() {
    let wiki = wiki(&[
        (
            "xwiki:Main.A",
            "{{displayinframe reference=\"B\" section=\"HTwo\"/}}\n{{displayinframe reference=\"B\" section=\"HNope\"/}}",
        ),
        ("xwiki:Main.B", "# One\nfirst\n# Two\nsecond"),
    ]);
    assert_eq!(
        plain(&wiki, "Main.A"),
        format!(
            "Two\n\nsecond\n\n{}[Cannot find section [HNope] in document [xwiki:Main.B]]",
            CALL_FAILED
        )
    );
}

#[test]
fn displayed_page_follows_request_locale() {
    let mut store = MemoryWiki::new();
    store.insert("xwiki:Main.A".parse().unwrap(), "{{displayinframe reference=\"B\"/}}");
    store.insert_document(
        wiki::DocumentModel::new("xwiki:Main.B".parse().unwrap(), "hello").with_translation("fr", "bonjour"),
    );
    let wiki = Wiki::new("xwiki", Arc::new(store), Arc::new(AccessRules::allow_all()));

    let request = RenderRequest {
        locale: Some("fr".into()),
        ..RenderRequest::default()
    };
    assert_eq!(to_plain_text(&render(&wiki, "Main.A", &request).children), "bonjour");
    assert_eq!(plain(&wiki, "Main.A"), "hello");
}

#[test]
fn displayed_headings_get_ids_unique_in_the_page() {
    let wiki = wiki(&[
        ("xwiki:Main.A", "# Intro\n{{displayinframe reference=\"B\"/}}"),
        ("xwiki:Main.B", "# Intro\nb"),
    ]);
    let out = html(&wiki, "Main.A");
    assert!(out.contains("<h1 id=\"HIntro\">"), "{}", out);
    assert!(out.contains("<h1 id=\"HIntro-1\">"), "{}", out);
}

#[test]
fn invalid_parameters_are_reported_in_place() {
    let wiki = wiki(&[("xwiki:Main.A", "{{displayinframe/}}\n{{displayinframe reference=\"B\" colour=\"red\"/}}")]);
    assert_eq!(
        plain(&wiki, "Main.A"),
        format!(
            "{}[You must specify a 'reference' parameter pointing to the document to display.]\n\n{}[Unknown parameter [colour]]",
            CALL_FAILED, CALL_FAILED
        )
    );
}

#[test]
fn repeated_renders_are_identical() {
    let wiki = wiki(&[
        ("xwiki:Main.A", "# A\n{{displayinframe reference=\"B\"/}}\n{{displayinframe reference=\"A\"/}}"),
        ("xwiki:Main.B", "# B\nb"),
    ]);
    let first = render(&wiki, "Main.A", &RenderRequest::default());
    let second = render(&wiki, "Main.A", &RenderRequest::default());
    assert_eq!(first, second);
}

#[test]
fn concurrent_renders_do_not_share_inclusion_state() {
    let wiki = Arc::new(wiki(&[
        ("xwiki:Main.A", "{{displayinframe reference=\"B\"/}}"),
        ("xwiki:Main.B", "b\n\n{{displayinframe reference=\"C\"/}}"),
        ("xwiki:Main.C", "c"),
    ]));

    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let wiki = &wiki;
                scope.spawn(move || {
                    (0..20)
                        .map(|_| plain(wiki, "Main.A"))
                        .last()
                        .unwrap_or_default()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(outputs.iter().all(|out| out == "b\n\nc"), "{:?}", outputs);
}

//! Metadata, outline, links and coordinate transforms

mod common;

use pdf_core::engine::fake::{FakeDocument, FakePage};
use pdf_core::{
    Bookmark, DocumentMeta, Link, LinkInfo, OutlineItem, Point, PointF, RectF, Rotation, Size,
    Viewport,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn item(title: &str, dest: Option<i32>, children: Vec<OutlineItem>) -> OutlineItem {
    OutlineItem {
        title: title.to_string(),
        dest_page: dest,
        children,
    }
}

#[test]
fn test_metadata_defaults_to_empty() {
    let mut core = common::new_core();
    let doc = common::open(
        &mut core,
        FakeDocument::with_pages(1)
            .meta("Title", "Annual Report")
            .meta("Producer", "pdf-core tests"),
    );

    assert_eq!(core.meta_text(doc, "Title"), "Annual Report");
    assert_eq!(core.meta_text(doc, "Author"), "");
    assert_eq!(
        core.document_meta(doc),
        DocumentMeta {
            title: "Annual Report".to_string(),
            producer: "pdf-core tests".to_string(),
            ..DocumentMeta::default()
        }
    );
}

#[test]
fn test_table_of_contents() {
    let mut core = common::new_core();
    let doc = common::open(
        &mut core,
        FakeDocument::with_pages(10).outline(vec![
            item(
                "Part I",
                Some(0),
                vec![item("Chapter 1", Some(1), vec![]), item("Chapter 2", Some(4), vec![])],
            ),
            item("Appendix", None, vec![]),
        ]),
    );

    let toc = core.table_of_contents(doc);
    assert_eq!(
        toc,
        vec![
            Bookmark {
                title: "Part I".to_string(),
                page_index: Some(0),
                children: vec![
                    Bookmark {
                        title: "Chapter 1".to_string(),
                        page_index: Some(1),
                        children: vec![],
                    },
                    Bookmark {
                        title: "Chapter 2".to_string(),
                        page_index: Some(4),
                        children: vec![],
                    },
                ],
            },
            Bookmark {
                title: "Appendix".to_string(),
                page_index: None,
                children: vec![],
            },
        ]
    );

    let appendix = core
        .first_child_bookmark(doc, None)
        .and_then(|first| core.next_sibling_bookmark(doc, first))
        .unwrap();
    assert_eq!(core.bookmark_dest_index(doc, appendix), -1);
    assert!(core.next_sibling_bookmark(doc, appendix).is_none());
}

#[test]
fn test_bookmarks_invalid_after_close() {
    let mut core = common::new_core();
    let doc = common::open(
        &mut core,
        FakeDocument::with_pages(1).outline(vec![item("Only", Some(0), vec![])]),
    );
    let bookmark = core.first_child_bookmark(doc, None).unwrap();
    core.close_document(doc);

    assert_eq!(core.bookmark_title(bookmark), "");
    assert_eq!(core.bookmark_dest_index(doc, bookmark), -1);
    assert!(core.first_child_bookmark(doc, None).is_none());
}

#[test]
fn test_resolved_page_links() {
    let mut core = common::new_core();
    let page = FakePage::new(612.0, 792.0)
        .link(LinkInfo {
            rect: Some(RectF::new(72.0, 720.0, 200.0, 700.0)),
            uri: Some("https://example.org/manual".to_string()),
            dest_page: None,
        })
        .link(LinkInfo {
            rect: Some(RectF::new(72.0, 100.0, 200.0, 80.0)),
            uri: None,
            dest_page: Some(3),
        });
    let doc = common::open(&mut core, FakeDocument::new(vec![page]));
    let page = core.load_page(doc, 0).unwrap();

    let links = core.page_links(page);
    assert_eq!(
        links,
        vec![
            Link {
                bounds: Some(RectF::new(72.0, 720.0, 200.0, 700.0)),
                uri: Some("https://example.org/manual".to_string()),
                dest_page_index: None,
            },
            Link {
                bounds: Some(RectF::new(72.0, 100.0, 200.0, 80.0)),
                uri: None,
                dest_page_index: Some(3),
            },
        ]
    );

    // A page without links yields an empty snapshot
    let bare = common::open(&mut core, FakeDocument::with_pages(1));
    let bare_page = core.load_page(bare, 0).unwrap();
    assert!(core.page_link_handles(bare_page).is_empty());
}

#[test]
fn test_page_size_scaling() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![FakePage::new(300.0, 400.0)]));
    let page = core.load_page(doc, 0).unwrap();

    assert_eq!(core.page_width_pixels(page, 72), Some(300));
    assert_eq!(core.page_height_pixels(page, 72), Some(400));
    assert_eq!(core.page_width_pixels(page, 144), Some(600));
    assert_eq!(core.page_height_pixels(page, 96), Some(533));
    assert_eq!(core.page_size_by_index(doc, 0, 144), Size::new(600, 800));
    assert_eq!(core.page_size_by_index(doc, -1, 144), Size::new(0, 0));
}

#[test]
fn test_rotated_transform() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![FakePage::new(100.0, 200.0)]));
    let page = core.load_page(doc, 0).unwrap();
    let viewport = Viewport::new(0, 0, 200, 100).with_rotation(Rotation::Cw90);

    // The page's top-left corner lands at the top-right of the display
    let corner = core
        .page_to_device(page, &viewport, PointF::new(0.0, 200.0))
        .unwrap();
    assert_eq!(corner, Point::new(200, 0));
}

proptest! {
    #[test]
    fn prop_device_page_device_round_trip(
        x in 0i32..600,
        y in 0i32..800,
        turns in 0i32..4,
    ) {
        let mut core = common::new_core();
        let doc = common::open(&mut core, FakeDocument::with_pages(1));
        let page = core.load_page(doc, 0).unwrap();
        let viewport = Viewport::new(10, 20, 600, 800)
            .with_rotation(Rotation::from_quarter_turns(turns));

        let on_page = core.device_to_page(page, &viewport, Point::new(x, y)).unwrap();
        let back = core.page_to_device(page, &viewport, on_page).unwrap();
        prop_assert!((back.x - x).abs() <= 1);
        prop_assert!((back.y - y).abs() <= 1);
    }
}

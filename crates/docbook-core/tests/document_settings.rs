use docbook_core::{ConvertOptions, EmitOptions, NodeKind, SectionHierarchy, SourceNode, convert_document};

fn titled_section(id: Option<&str>, heading: &str, mut children: Vec<SourceNode>) -> SourceNode {
    children.insert(
        0,
        SourceNode::with_children(NodeKind::Title, vec![SourceNode::text(heading)]),
    );
    SourceNode::with_children(
        NodeKind::Section {
            level: 1,
            id: id.map(str::to_string),
        },
        children,
    )
}

fn options() -> ConvertOptions {
    ConvertOptions {
        emit: EmitOptions { indent: false },
        ..ConvertOptions::default()
    }
}

fn body(xml: &str) -> &str {
    xml.lines().nth(2).unwrap_or("")
}

#[test]
fn titles_get_ids_derived_from_their_owner() {
    let tree = SourceNode::with_children(
        NodeKind::Document,
        vec![titled_section(
            Some("intro"),
            "Intro",
            vec![titled_section(None, "Untitled id", vec![]), titled_section(Some("more"), "More", vec![])],
        )],
    );
    let settings = ConvertOptions {
        use_ids_in_titles: true,
        ..options()
    };
    let result = convert_document(&tree, &settings).unwrap();

    assert_eq!(
        body(&result.xml),
        "<section id=\"intro\"><title id=\"intro.title\">Intro</title>\
         <sect2><title>Untitled id</title></sect2>\
         <sect2 id=\"more\"><title id=\"more.title\">More</title></sect2></section>"
    );
}

#[test]
fn document_id_takes_the_root_and_keeps_the_old_id_reachable() {
    let tree = SourceNode::with_children(
        NodeKind::Document,
        vec![titled_section(Some("intro"), "Intro", vec![])],
    );
    let settings = ConvertOptions {
        document_id: Some("guide".into()),
        ..options()
    };
    let result = convert_document(&tree, &settings).unwrap();

    assert_eq!(
        body(&result.xml),
        "<section id=\"guide\"><title>Intro</title><anchor id=\"intro\"/></section>"
    );
}

#[test]
fn custom_hierarchy_changes_nested_tags() {
    let tree = SourceNode::with_children(
        NodeKind::Document,
        vec![titled_section(None, "Top", vec![titled_section(None, "Inner", vec![])])],
    );
    let settings = ConvertOptions {
        root_element: "article".into(),
        hierarchy: SectionHierarchy::new(["article", "sect1", "sect2"]),
        ..options()
    };
    let result = convert_document(&tree, &settings).unwrap();

    assert_eq!(
        body(&result.xml),
        "<article><title>Top</title><sect1><title>Inner</title></sect1></article>"
    );
}

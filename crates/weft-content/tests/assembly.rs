//! End-to-end assembly tests over mock and filesystem sources.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use weft_content::key::{BRANCH_SEP, LEAF_SEP};
use weft_content::{
    Content, Kind, Metadata, MissingSections, Page, SiteOptions, Sites, TreeNavigation,
};
use weft_source::MockSource;
use weft_source_fs::FsSource;

fn build(source: &MockSource) -> Sites {
    Sites::build(source, &SiteOptions::default()).unwrap()
}

fn keys(pages: &[Arc<Page>]) -> Vec<&str> {
    pages.iter().map(|p| p.key()).collect()
}

#[test]
fn test_pages_without_index_get_synthesized_section() {
    let source = MockSource::new()
        .with_file("blog/post-a.md", "")
        .with_file("blog/post-b.md", "");
    let sites = build(&source);
    let site = sites.default_site().unwrap();
    let map = site.map();

    let blog = map.section_page("/blog/").unwrap();
    assert!(blog.file().is_none());
    assert_eq!(blog.kind(), Kind::Section);
    assert_eq!(
        keys(&blog.regular_pages(map)),
        vec!["/blog/__hb_post-a__hl_", "/blog/__hb_post-b__hl_"]
    );

    let home = site.home().unwrap();
    assert_eq!(keys(&home.sections(map)), vec!["/blog/"]);
}

#[test]
fn test_section_backed_by_index_file() {
    let source = MockSource::new()
        .with_file("blog/_index.md", "---\ntitle: News\nweight: 3\n---\nWelcome")
        .with_file("blog/post-a.md", "");
    let sites = build(&source);
    let map = sites.default_site().unwrap().map();

    let blog = map.section_page("/blog/").unwrap();
    assert_eq!(blog.file().unwrap().path(), "blog/_index.md");
    assert_eq!(blog.title(), "News");
    assert_eq!(blog.weight(), 3);
    assert_eq!(blog.raw_content(), "Welcome");
}

#[test]
fn test_leaf_bundle_owns_its_resources() {
    let source = MockSource::new()
        .with_file("essays/my-essay/index.md", "")
        .with_file("essays/my-essay/cover.jpg", "");
    let sites = build(&source);
    let map = sites.default_site().unwrap().map();

    assert_eq!(map.pages().keys(), vec!["/essays/__hb_my-essay__hl_"]);
    assert_eq!(
        map.resources().keys(),
        vec!["/essays/__hb_my-essay__hl_cover.jpg"]
    );
    assert!(map.sections().keys().iter().all(|k| !k.contains("cover")));

    let essay = map
        .get_page("essays", "my-essay")
        .and_then(|n| n.page())
        .unwrap();
    let resources: Vec<&str> = essay.resources(map).iter().map(|f| f.path()).collect();
    assert_eq!(resources, vec!["essays/my-essay/cover.jpg"]);
}

#[test]
fn test_removing_last_page_drops_synthesized_section() {
    let source = MockSource::new()
        .with_file("blog/only.md", "")
        .with_file("docs/_index.md", "");
    let options = SiteOptions::default();
    let mut sites = Sites::build(&source, &options).unwrap();
    let site = sites.get_mut("en").unwrap();
    assert!(site.map().get_section("blog").is_some());

    assert!(site.map_mut().remove_file("blog/only.md"));
    let report = site.rebuild(&options);

    assert_eq!(report.orphans_removed, 1);
    assert!(site.map().get_section("blog").is_none());
    assert!(site.map().get_section("docs").is_some());
}

#[test]
fn test_main_section_is_largest_first_level_section() {
    let mut source = MockSource::new();
    for i in 0..12 {
        source = source.with_file(&format!("blog/post-{i}.md"), "");
    }
    for i in 0..5 {
        source = source.with_file(&format!("docs/page-{i}.md"), "");
    }
    let sites = build(&source);
    let map = sites.default_site().unwrap().map();

    let main = map.main_section().unwrap();
    assert_eq!(main.name, "blog");
    assert_eq!(main.page_count, 12);
    assert_eq!(map.section_stats("/").unwrap().page_count, 17);
}

#[test]
fn test_keys_are_unique_across_trees() {
    let source = MockSource::new()
        .with_file("a.md", "")
        .with_file("a/_index.md", "")
        .with_file("a/d.md", "")
        .with_file("a/b/index.md", "")
        .with_file("a/c/index.md", "")
        .with_file("a/c/data.json", "")
        .with_file("a/logo.png", "");
    let sites = build(&source);
    let map = sites.default_site().unwrap().map();

    let mut seen = HashSet::new();
    for key in map
        .sections()
        .keys()
        .into_iter()
        .chain(map.pages().keys())
        .chain(map.resources().keys())
    {
        assert!(seen.insert(key.clone()), "duplicate key {key}");
    }
}

#[test]
fn test_every_page_and_resource_has_a_section() {
    let source = MockSource::new()
        .with_file("a/b/c/deep.md", "")
        .with_file("x/y/index.md", "")
        .with_file("x/y/img.png", "")
        .with_file("z.txt", "");

    for missing_sections in [MissingSections::Root, MissingSections::Eager] {
        let options = SiteOptions {
            missing_sections,
            ..SiteOptions::default()
        };
        let sites = Sites::build(&source, &options).unwrap();
        let map = sites.default_site().unwrap().map();

        for key in map.pages().keys().into_iter().chain(map.resources().keys()) {
            let section = map.section_for(&key).unwrap();
            assert!(map.section_page(&section).is_some(), "{key} in {section}");
        }
    }
}

#[test]
fn test_root_exists_without_input() {
    let sites = build(&MockSource::new());
    let site = sites.default_site().unwrap();

    assert_eq!(site.map().sections().keys(), vec!["/"]);
    assert_eq!(site.home().unwrap().kind(), Kind::Home);
}

#[test]
fn test_file_backed_empty_section_survives_cleanup() {
    let source = MockSource::new().with_file("empty/_index.md", "");
    let sites = build(&source);
    let site = sites.default_site().unwrap();

    assert_eq!(site.report().orphans_removed, 0);
    assert!(site.map().get_section("empty").is_some());
}

#[test]
fn test_bucket_listings_are_stable() {
    let source = MockSource::new()
        .with_file("blog/b.md", "---\nweight: 2\n---\n")
        .with_file("blog/a.md", "---\nweight: 1\n---\n")
        .with_file("blog/sub/_index.md", "");
    let sites = build(&source);
    let map = sites.default_site().unwrap().map();
    let bucket = Arc::clone(map.section_page("/blog/").unwrap().bucket().unwrap());

    let first: Vec<String> = bucket
        .pages_and_sections(map)
        .iter()
        .map(|p| p.key().to_owned())
        .collect();
    let second: Vec<String> = bucket
        .pages_and_sections(map)
        .iter()
        .map(|p| p.key().to_owned())
        .collect();

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec!["/blog/__hb_a__hl_", "/blog/__hb_b__hl_", "/blog/sub/"]
    );
}

#[test]
fn test_default_sort_breaks_ties_by_title_then_path() {
    let date = "date: 2024-05-01";
    let source = MockSource::new()
        .with_file("s/x.md", format!("---\ntitle: Beta\n{date}\n---\n"))
        .with_file("s/y.md", format!("---\ntitle: alpha\n{date}\n---\n"))
        .with_file("s/z.md", format!("---\ntitle: Beta\n{date}\n---\n"));
    let sites = build(&source);
    let map = sites.default_site().unwrap().map();

    let pages = map.section_page("/s/").unwrap().regular_pages(map);

    assert_eq!(
        keys(&pages),
        vec!["/s/__hb_y__hl_", "/s/__hb_x__hl_", "/s/__hb_z__hl_"]
    );
}

#[test]
fn test_eager_sections_nest_every_directory() {
    let source = MockSource::new().with_file("docs/guide/setup/install.md", "");
    let options = SiteOptions {
        missing_sections: MissingSections::Eager,
        ..SiteOptions::default()
    };
    let sites = Sites::build(&source, &options).unwrap();
    let map = sites.default_site().unwrap().map();

    assert_eq!(
        map.sections().keys(),
        vec!["/", "/docs/", "/docs/guide/", "/docs/guide/setup/"]
    );
    let page = map.get_page("docs/guide/setup", "install").unwrap();
    assert_eq!(
        page.page().unwrap().parent(map).unwrap().key(),
        "/docs/guide/setup/"
    );
}

#[test]
fn test_root_mode_nests_under_first_level_section() {
    let source = MockSource::new().with_file("docs/guide/setup/install.md", "");
    let sites = build(&source);
    let map = sites.default_site().unwrap().map();

    assert_eq!(map.sections().keys(), vec!["/", "/docs/"]);
    let key = format!("/docs/{BRANCH_SEP}guide/setup/install{LEAF_SEP}");
    assert!(map.pages().contains(&key));
}

#[test]
fn test_translations_land_in_their_site() {
    let source = MockSource::new()
        .with_languages(&["en", "fr"])
        .with_file("blog/post.md", "---\ntitle: Hello\n---\n")
        .with_file("blog/post.fr.md", "---\ntitle: Bonjour\n---\n")
        .with_file("blog/only-en.md", "");
    let options = SiteOptions {
        languages: vec!["fr".to_owned()],
        ..SiteOptions::default()
    };
    let sites = Sites::build(&source, &options).unwrap();

    assert_eq!(sites.len(), 2);
    let title = |lang: &str| {
        let map = sites.get(lang).unwrap().map();
        let node = map.get_page("blog", "post").unwrap();
        node.page().unwrap().title().to_owned()
    };
    assert_eq!(title("en"), "Hello");
    assert_eq!(title("fr"), "Bonjour");
    assert_eq!(sites.get("fr").unwrap().map().pages().len(), 1);
    assert_eq!(sites.get("fr").unwrap().home().unwrap().lang(), "fr");
}

#[test]
fn test_cascade_flows_down_without_overriding() {
    let source = MockSource::new()
        .with_file(
            "blog/_index.md",
            "---\ncascade:\n  banner: blog.png\n  layout: post\n---\n",
        )
        .with_file("blog/a.md", "---\nlayout: custom\n---\n")
        .with_file("blog/deep/b.md", "");
    let mut cascade = weft_content::Params::new();
    cascade.insert("author".to_owned(), "Team".into());
    let options = SiteOptions {
        cascade,
        missing_sections: MissingSections::Eager,
        ..SiteOptions::default()
    };
    let sites = Sites::build(&source, &options).unwrap();
    let map = sites.default_site().unwrap().map();

    let a = map.get_page("blog", "a").unwrap().page().unwrap();
    assert_eq!(a.param("layout").unwrap(), "custom");
    assert_eq!(a.param("banner").unwrap(), "blog.png");
    assert_eq!(a.param("author").unwrap(), "Team");

    let b = map.get_page("blog/deep", "b").unwrap().page().unwrap();
    assert_eq!(b.param("layout").unwrap(), "post");
}

#[test]
fn test_drafts_are_excluded_unless_requested() {
    let source = MockSource::new()
        .with_file("blog/draft.md", "---\ndraft: true\n---\n")
        .with_file("blog/live.md", "")
        .with_file("wip/_index.md", "---\ndraft: true\n---\n")
        .with_file("wip/page.md", "");

    let sites = build(&source);
    let site = sites.default_site().unwrap();
    assert_eq!(site.map().pages().keys(), vec!["/blog/__hb_live__hl_"]);
    assert!(site.map().get_section("wip").is_none());
    assert_eq!(site.report().excluded, 2);

    let options = SiteOptions {
        build_drafts: true,
        ..SiteOptions::default()
    };
    let sites = Sites::build(&source, &options).unwrap();
    assert_eq!(sites.default_site().unwrap().map().pages().len(), 3);
}

#[test]
fn test_filter_skips_files() {
    let source = MockSource::new()
        .with_file("blog/keep.md", "")
        .with_file("blog/skip.md", "");
    let options = SiteOptions::default().with_filter(|f| !f.path().contains("skip"));
    let sites = Sites::build(&source, &options).unwrap();

    assert_eq!(
        sites.default_site().unwrap().map().pages().keys(),
        vec!["/blog/__hb_keep__hl_"]
    );
}

#[test]
fn test_front_matter_error_fails_build() {
    let source = MockSource::new().with_file("blog/bad.md", "---\ntitle: [\n---\n");

    let err = Sites::build(&source, &SiteOptions::default()).unwrap_err();

    assert!(err.to_string().contains("blog/bad.md"), "{err}");
}

#[test]
fn test_build_from_filesystem() {
    let temp = tempfile::tempdir().unwrap();
    let content = temp.path().join("content");
    let theme = temp.path().join("theme");
    fs::create_dir_all(content.join("blog/trip")).unwrap();
    fs::create_dir_all(theme.join("about")).unwrap();
    fs::write(content.join("_index.md"), "---\ntitle: Home\n---\n").unwrap();
    fs::write(content.join("blog/first.md"), "---\ntitle: First\n---\n").unwrap();
    fs::write(content.join("blog/first.fr.md"), "---\ntitle: Premier\n---\n").unwrap();
    fs::write(content.join("blog/trip/index.md"), "").unwrap();
    fs::write(content.join("blog/trip/photo.jpg"), [0u8; 4]).unwrap();
    fs::write(theme.join("about/_index.md"), "---\ntitle: About\n---\n").unwrap();
    fs::write(theme.join("_index.md"), "---\ntitle: Theme Home\n---\n").unwrap();

    let languages = vec!["en".to_owned(), "fr".to_owned()];
    let source = FsSource::new(&content)
        .with_root(&theme)
        .with_languages(&languages);
    let options = SiteOptions {
        languages,
        ..SiteOptions::default()
    };
    let sites = Sites::build(&source, &options).unwrap();

    let en = sites.get("en").unwrap();
    assert_eq!(en.home().unwrap().title(), "Home");
    assert_eq!(
        en.map().sections().keys(),
        vec!["/", "/about/", "/blog/"]
    );
    assert_eq!(
        en.map().pages().keys(),
        vec!["/blog/__hb_first__hl_", "/blog/__hb_trip__hl_"]
    );
    assert_eq!(en.map().resources().len(), 1);

    let fr = sites.get("fr").unwrap();
    let premier = fr.map().get_page("blog", "first").unwrap().page().unwrap();
    assert_eq!(premier.title(), "Premier");
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_does_not_duplicate_pages() {
    let temp = tempfile::tempdir().unwrap();
    let content = temp.path().join("content");
    fs::create_dir_all(content.join("blog")).unwrap();
    fs::write(content.join("blog/a.md"), "").unwrap();
    std::os::unix::fs::symlink(&content, content.join("blog/loop")).unwrap();

    let sites = Sites::build(&FsSource::new(&content), &SiteOptions::default()).unwrap();

    assert_eq!(
        sites.default_site().unwrap().map().pages().keys(),
        vec!["/blog/__hb_a__hl_"]
    );
}

#[test]
fn test_eager_section_parent_ignores_page_presence() {
    let options = SiteOptions {
        missing_sections: MissingSections::Eager,
        ..SiteOptions::default()
    };
    let bare = MockSource::new().with_file("a/b/c/_index.md", "");
    let with_page = MockSource::new()
        .with_file("a/b/c/_index.md", "")
        .with_file("a/b/c/x.md", "");

    for source in [bare, with_page] {
        let sites = Sites::build(&source, &options).unwrap();
        let map = sites.default_site().unwrap().map();
        let section = map.section_page("/a/b/c/").unwrap();

        assert_eq!(section.parent(map).unwrap().key(), "/a/b/");
    }
}

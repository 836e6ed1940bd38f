//! Extraction and normalization over saved pages
use estela_core::*;
use rstest::rstest;
use time::macros::datetime;

const SOURCE_URL: &str = "https://aemetblog.es/2026/02/12/engelamiento/";

fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/../../tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read(path).unwrap()
}

fn capture(name: &str) -> NormalizedCapture {
    let page = RawPage::new(SOURCE_URL, fixture(name), datetime!(2026-02-12 10:15:00 UTC));
    let doc = Extractor::new(&PipelineConfig::default()).extract(&page).unwrap();
    normalize(doc).unwrap()
}

fn capture_html(html: &str) -> Result<NormalizedCapture> {
    let doc = Extractor::new(&PipelineConfig::default()).extract(&RawPage::now(SOURCE_URL, html))?;
    normalize(doc)
}

const PROSE: &str = "El engelamiento es la acumulación de hielo sobre la estructura de una aeronave en vuelo";

#[rstest]
#[case("engelamiento_minimal.html", 0)]
#[case("engelamiento_full.html", 8)]
fn test_fixture_capture(#[case] name: &str, #[case] images: usize) {
    let capture = capture(name);

    assert_eq!(capture.title.as_deref(), Some("Engelamiento: la invención de una palabra aeronáutica"));
    assert_eq!(capture.published.as_deref(), Some("2026-02-12T09:00:00+01:00"));
    assert_eq!(capture.image_count(), images);

    let kinds: Vec<BlockKind> = capture.blocks.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Paragraph,
            BlockKind::Heading { level: 2 },
            BlockKind::Paragraph,
            BlockKind::Paragraph,
            BlockKind::ListItem { ordered: false },
            BlockKind::ListItem { ordered: false },
            BlockKind::Paragraph,
        ]
    );
    assert!(capture.blocks[3].text.ends_with("publicado en Madrid[^1]."));
    assert_eq!(capture.footnotes.len(), 1);
    assert_eq!(capture.footnotes[0].number, 1);
    assert_eq!(
        capture.footnotes[0].text,
        "Servicio Meteorológico Nacional, Manual de meteorología aeronáutica, Madrid, 1948."
    );
}

#[test]
fn test_chrome_does_not_change_content() {
    let minimal = capture("engelamiento_minimal.html");
    let full = capture("engelamiento_full.html");

    assert!(minimal.content_eq(&full));
    assert_eq!(minimal.content_digest(), full.content_digest());
    assert!(full.blocks.iter().all(|b| !b.text.contains("Comparte esto")));
    assert!(full.blocks.iter().all(|b| !b.text.contains("Suscríbete")));
}

#[test]
fn test_full_page_images_in_order() {
    let full = capture("engelamiento_full.html");

    assert_eq!(full.images.iter().map(|i| i.index).collect::<Vec<_>>(), (1..=8).collect::<Vec<u32>>());
    assert_eq!(full.images[0].url, "https://aemetblog.es/wp-content/uploads/2026/02/engelamiento-01.jpg");
    assert_eq!(full.images[0].alt.as_deref(), Some("Hielo en el borde de ataque de un ala"));
    assert_eq!(full.images[2].alt, None);
    assert!(full.images.iter().all(|i| !i.url.contains("logo")));
}

#[test]
fn test_normalization_is_idempotent() {
    let first = capture("engelamiento_full.html");
    let second = capture("engelamiento_full.html");

    assert_eq!(first, second);
    assert_eq!(first.content_digest(), second.content_digest());
}

#[test]
fn test_fetched_at_is_not_content() {
    let page = |at| RawPage::new(SOURCE_URL, fixture("engelamiento_minimal.html"), at);
    let extractor = Extractor::new(&PipelineConfig::default());

    let morning = normalize(extractor.extract(&page(datetime!(2026-02-12 08:00:00 UTC))).unwrap()).unwrap();
    let evening = normalize(extractor.extract(&page(datetime!(2026-02-12 20:00:00 UTC))).unwrap()).unwrap();

    assert_ne!(morning.fetched_at, evening.fetched_at);
    assert!(morning.content_eq(&evening));
}

#[test]
fn test_footnotes_renumbered_by_first_appearance() {
    let html = format!(
        r##"<article>
            <p>{PROSE}, según el primer manual<sup><a href="#fn3">3</a></sup>.</p>
            <p>{PROSE}, según la norma<sup><a href="#fn1">1</a></sup> y el glosario<sup><a href="#fn2">2</a></sup>.</p>
            <ol class="footnotes">
                <li id="fn1">Norma de 1952.</li>
                <li id="fn2">Glosario de la OMM.</li>
                <li id="fn3">Manual de 1948.</li>
            </ol>
        </article>"##
    );
    let capture = capture_html(&html).unwrap();

    assert!(capture.blocks[0].text.ends_with("primer manual[^1]."));
    assert!(capture.blocks[1].text.ends_with("la norma[^2] y el glosario[^3]."));
    assert_eq!(
        capture.footnotes.iter().map(|f| (f.number, f.marker.as_str(), f.text.as_str())).collect::<Vec<_>>(),
        vec![(1, "3", "Manual de 1948."), (2, "1", "Norma de 1952."), (3, "2", "Glosario de la OMM.")]
    );
}

#[test]
fn test_repeated_marker_keeps_one_number() {
    let html = format!(
        r##"<article>
            <p>{PROSE} (1).</p>
            <p>{PROSE}, como ya se dijo (1).</p>
            <p>(1) Manual de 1948.</p>
        </article>"##
    );
    let capture = capture_html(&html).unwrap();

    assert_eq!(capture.footnotes.len(), 1);
    assert!(capture.blocks.iter().all(|b| b.text.ends_with("[^1].")));
}

#[test]
fn test_dangling_marker_aborts() {
    let html = format!(
        r##"<article>
            <p>{PROSE}<sup>1</sup> y otra nota<sup>2</sup>.</p>
            <div class="footnotes"><ol><li id="fn1">Única nota.</li></ol></div>
        </article>"##
    );
    let result = capture_html(&html);

    assert!(matches!(result, Err(EstelaError::DanglingFootnoteMarker { ref marker }) if marker == "2"));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Normalization);
}

#[test]
fn test_orphan_footnote_aborts() {
    let html = format!(
        r##"<article>
            <p>{PROSE}<sup>1</sup>.</p>
            <div class="footnotes"><ol><li id="fn1">Primera.</li><li id="fn2">Nadie la cita.</li></ol></div>
        </article>"##
    );

    assert!(matches!(capture_html(&html), Err(EstelaError::OrphanFootnote { ref marker }) if marker == "2"));
}

#[rstest]
#[case::enumeration_beside_sup(
    r##"<p>{PROSE}<sup><a href="#fn1">1</a></sup>. Las fases son dos: (1) formación y (2) acumulación.</p>
        <div class="footnotes"><ol><li id="fn1">Manual de 1948.</li></ol></div>"##,
    0,
    "vuelo[^1]. Las fases son dos: (1) formación y (2) acumulación."
)]
#[case::reference_without_definition(
    "<p>{PROSE} (1).</p><p>{PROSE}, como explica el capítulo (3).</p><p>(1) Manual de 1948.</p>",
    1,
    "vuelo, como explica el capítulo (3)."
)]
#[case::short_referencing_paragraph(
    "<p>{PROSE}.</p><p>Así lo define el manual (1).</p><p>{PROSE}.</p><p>(1) Manual de 1948.</p>",
    1,
    "Así lo define el manual[^1]."
)]
fn test_parenthesised_numbers_in_prose(#[case] body: &str, #[case] block: usize, #[case] expected: &str) {
    let html = format!("<article>{}</article>", body.replace("{PROSE}", PROSE));
    let capture = capture_html(&html).unwrap();

    assert!(capture.blocks[block].text.ends_with(expected), "{:?}", capture.blocks[block].text);
    assert_eq!(
        capture.footnotes.iter().map(|f| (f.number, f.text.as_str())).collect::<Vec<_>>(),
        vec![(1, "Manual de 1948.")]
    );
}

#[test]
fn test_repeated_paragraphs_are_kept() {
    let html = format!("<article><p>{PROSE}.</p><p>{PROSE}.</p></article>");
    let capture = capture_html(&html).unwrap();

    assert_eq!(capture.blocks.len(), 2);
    assert_eq!(capture.blocks[0], capture.blocks[1]);
}

#[rstest]
#[case("<html><body></body></html>")]
#[case("<html><body><nav><a href='/'>Inicio</a> <a href='/blog'>Blog</a></nav></body></html>")]
fn test_pages_without_body(#[case] html: &str) {
    let result = capture_html(html);
    assert!(matches!(result, Err(EstelaError::NoArticleBody { .. })));
}

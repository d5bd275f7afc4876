use std::io::{self, Write};

use citymap::renderer::{self, MapRenderer};
use citymap::{Catalog, City, DirectoryError, MarkerColor, RenderKind};

fn renderer() -> MapRenderer {
    MapRenderer::with_embedded(720).unwrap()
}

fn city(id: i64, name: &str, latitude: f64, longitude: f64) -> City {
    City {
        id,
        name: name.to_string(),
        latitude,
        longitude,
        country: "Testland".to_string(),
        population: 1,
    }
}

fn catalog() -> Catalog {
    Catalog::from_cities(vec![
        city(1, "Paris", 48.8566, 2.3522),
        city(2, "Suva", -18.1416, 178.4419),
        city(3, "Longyearbyen", 78.2167, 15.6333),
    ])
}

fn marker_pixels(png: &[u8], color: MarkerColor) -> usize {
    let img = image::load_from_memory(png).unwrap().to_rgba8();
    let target = image::Rgba(color.rgba());
    img.pixels().filter(|p| **p == target).count()
}

struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only sink"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_empty_render_is_basemap_only() {
    let mut sink = Vec::new();
    renderer().render(&[], MarkerColor::Red, &mut sink).unwrap();

    let img = image::load_from_memory(&sink).unwrap();
    assert!(img.width() >= 720);
    assert!(img.height() >= 360);
    assert_eq!(marker_pixels(&sink, MarkerColor::Red), 0);
}

#[test]
fn test_markers_use_requested_color() {
    let r = renderer();
    let cities: Vec<City> = catalog().iter().cloned().collect();

    let png = r.render_png(&cities, MarkerColor::Green).unwrap();
    assert!(marker_pixels(&png, MarkerColor::Green) > 0);
    assert_eq!(marker_pixels(&png, MarkerColor::Red), 0);
}

#[test]
fn test_render_is_deterministic() {
    let r = renderer();
    let cities: Vec<City> = catalog().iter().cloned().collect();

    let first = r.render_png(&cities, MarkerColor::Blue).unwrap();
    let second = r.render_png(&cities, MarkerColor::Blue).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unknown_names_are_skipped() {
    let r = renderer();
    let catalog = catalog();

    let mut with_unknown = Vec::new();
    r.render_names(&catalog, &["Atlantis", "Paris", "El Dorado"], MarkerColor::Purple, &mut with_unknown)
        .unwrap();
    let mut only_known = Vec::new();
    r.render_names(&catalog, &["Paris"], MarkerColor::Purple, &mut only_known)
        .unwrap();
    assert_eq!(with_unknown, only_known);

    let mut none_known = Vec::new();
    r.render_names(&catalog, &["Atlantis"], MarkerColor::Purple, &mut none_known)
        .unwrap();
    assert_eq!(none_known, r.render_png(&[], MarkerColor::Purple).unwrap());
}

#[test]
fn test_resolve_names_keeps_order_and_duplicates() {
    let catalog = catalog();
    let resolved = MapRenderer::resolve_names(&catalog, &["Suva", "Nowhere", "Paris", "Suva"]);
    let names: Vec<&str> = resolved.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Suva", "Paris", "Suva"]);
}

#[test]
fn test_unwritable_sink_is_io_failure() {
    let err = renderer()
        .render(&[city(1, "Paris", 48.8566, 2.3522)], MarkerColor::Red, &mut FailingSink)
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Io(_)));
}

#[test]
fn test_edge_coordinates_do_not_panic() {
    let cities = vec![
        city(1, "North Pole", 90.0, 0.0),
        city(2, "Date Line East", 0.0, 180.0),
        city(3, "Date Line West", -89.9, -180.0),
    ];
    let png = renderer().render_png(&cities, MarkerColor::Black).unwrap();
    assert!(image::load_from_memory(&png).is_ok());
}

#[test]
fn test_font_override_matches_bundled_font() {
    let font = renderer::load_font(std::path::Path::new("data/fonts/DejaVuSans.ttf")).unwrap();
    let from_disk = MapRenderer::new(citymap::basemap::Basemap::embedded().unwrap(), font, 720);
    let cities: Vec<City> = catalog().iter().cloned().collect();

    assert_eq!(
        from_disk.render_png(&cities, MarkerColor::Yellow).unwrap(),
        renderer().render_png(&cities, MarkerColor::Yellow).unwrap()
    );
}

#[test]
fn test_unparsable_font_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.ttf");
    std::fs::write(&bogus, b"not a font").unwrap();
    assert!(matches!(renderer::load_font(&bogus), Err(DirectoryError::Font(_))));
    assert!(matches!(
        renderer::load_font(&dir.path().join("missing.ttf")),
        Err(DirectoryError::Io(_))
    ));
}

#[test]
fn test_off_globe_coordinates_do_not_panic() {
    let bogus = City {
        latitude: 1.0e12,
        longitude: 500.0,
        ..city(1, "Bogus", 0.0, 0.0)
    };
    let png = renderer().render_png(&[bogus], MarkerColor::Red).unwrap();
    assert_eq!(png, renderer().render_png(&[], MarkerColor::Red).unwrap());
}

#[test]
fn test_render_to_file_uses_unique_paths() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("maps");
    let r = renderer();
    let cities = vec![city(1, "Paris", 48.8566, 2.3522)];

    let first = r
        .render_to_file(&cities, MarkerColor::Red, &out, 42, RenderKind::Saved)
        .unwrap();
    let second = r
        .render_to_file(&cities, MarkerColor::Red, &out, 42, RenderKind::Saved)
        .unwrap();

    assert_ne!(first, second);
    let file_name = first.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("map_saved_42_"));
    assert!(file_name.ends_with(".png"));
    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    assert!(image::open(&first).is_ok());

    // Only the two finished maps remain; no temporary files are left behind.
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
}

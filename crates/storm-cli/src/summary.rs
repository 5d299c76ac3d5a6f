use console::Style;
use storm_core::config::OutputPaths;
use storm_core::driver::RunSummary;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(summary: &RunSummary, outputs: &OutputPaths) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("dSTORM Reconstruction"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!(
        "  {:<16}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(summary.frame_count)
    );
    println!(
        "  {:<16}{}x{}",
        s.label.apply_to("Frame size"),
        s.value.apply_to(summary.width),
        s.value.apply_to(summary.height)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Factor"),
        s.value.apply_to(summary.factor)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Localizations"),
        s.value.apply_to(summary.total_localizations)
    );
    println!();

    println!(
        "  {:<16}{}",
        s.label.apply_to("Image"),
        s.path.apply_to(outputs.image.display())
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Catalogue"),
        s.path.apply_to(outputs.coordsfile.display())
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Filter"),
        s.path.apply_to(outputs.filter.display())
    );
    println!();
}

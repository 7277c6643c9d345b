use std::path::Path;

use console::Style;
use destretch_core::pipeline::config::{DestretchConfig, RollingConfig};
use destretch_core::pipeline::RunSummary;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title.apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

fn print_io(s: &Styles, frames: usize, out_dir: &Path) {
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(frames)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(out_dir.display())
    );
}

pub fn print_registration_summary(
    title: &str,
    config: &DestretchConfig,
    frames: usize,
    out_dir: &Path,
) {
    let s = Styles::new();
    print_title(&s, title);
    print_io(&s, frames, out_dir);
    println!();

    println!("  {}", s.header.apply_to("Registration"));
    let kernels: Vec<String> = config.kernel_sizes.iter().map(|k| k.to_string()).collect();
    println!(
        "    {:<12}{}",
        s.label.apply_to("Kernels"),
        s.value.apply_to(kernels.join(" -> "))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Reference"),
        s.method.apply_to(&config.reference)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Axes"),
        s.value.apply_to(config.index_convention)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Apodization"),
        s.value.apply_to(format!("{:.2}", config.apodization))
    );
    if config.zero_mean {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Zero mean"),
            s.method.apply_to("on")
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Zero mean"),
            s.disabled.apply_to("off")
        );
    }
    println!();
}

pub fn print_rolling_summary(config: &RollingConfig, frames: usize, out_dir: &Path) {
    let s = Styles::new();
    print_title(&s, "Rolling Median");
    print_io(&s, frames, out_dir);
    println!();

    println!("  {}", s.header.apply_to("Window"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Margins"),
        s.value
            .apply_to(format!("{} / {}", config.margin_left, config.margin_right))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Edges"),
        s.method.apply_to(config.edge_policy)
    );
    println!();
}

pub fn print_run_result(summary: &RunSummary) {
    let s = Styles::new();
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Written"),
        s.value.apply_to(summary.outputs.len())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(summary.elapsed_display())
    );
}

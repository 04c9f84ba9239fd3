mod paths;

use std::path::PathBuf;

use tracing::info;
use tron::prelude::*;

use paths::AppPaths;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args
        .first()
        .is_some_and(|a| a == "--help" || a == "-h" || a == "help")
    {
        print_help();
        return Ok(());
    }

    let config = registry_config(&mut args)?;

    match args.first().map(String::as_str) {
        None => run_demo(config)?,
        Some("cycle-demo") => run_cycle_demo()?,
        Some("delay-demo") => run_delay_demo()?,
        Some("export") => {
            let Some(out) = args.get(1) else {
                eprintln!("export needs a destination path");
                print_help();
                std::process::exit(2);
            };
            run_export(config, PathBuf::from(out))?;
        }
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(2);
        }
    }
    Ok(())
}

/// Pull `--registry <path>` / `--data-dir` out of `args`.
///
/// Precedence: `--registry`, then `--data-dir`, then `$TRON_REGISTRY`, then
/// `.tron_registry.json` in the working directory.
fn registry_config(args: &mut Vec<String>) -> std::result::Result<RegistryConfig, String> {
    let mut config = RegistryConfig::from_env();
    let mut explicit = false;

    if let Some(i) = args.iter().position(|a| a == "--registry") {
        if i + 1 >= args.len() {
            return Err("--registry needs a path".to_string());
        }
        let path = args.remove(i + 1);
        args.remove(i);
        config.path = PathBuf::from(path);
        explicit = true;
    }

    if let Some(i) = args.iter().position(|a| a == "--data-dir") {
        args.remove(i);
        if !explicit {
            config.path = AppPaths::new()?.registry_file();
        }
    }

    Ok(config)
}

fn print_help() {
    println!("tron: activation units over a durable label registry");
    println!("usage:");
    println!("  tron [--registry <path> | --data-dir]");
    println!("  tron cycle-demo");
    println!("  tron delay-demo");
    println!("  tron [--registry <path> | --data-dir] export <path>");
    println!("  tron --help");
    println!();
    println!("The registry defaults to $TRON_REGISTRY, else ./.tron_registry.json");
}

/// Two labeled nodes joined by a symbolic root with Hebbian drift, then a
/// pair of embedding tokens, one of which is mutated.
fn run_demo(config: RegistryConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::open(config)?;
    let mut field = Field::with_registry(registry);

    let eye = field.add_bound_node("input.left_eye", NodeConfig::default().with_state(0.5))?;
    let parse = field.add_bound_node("logic.parse", NodeConfig::default().with_state(0.0))?;

    let root = field.connect(
        eye,
        parse,
        RootConfig::default()
            .with_weight(1.2)
            .with_logic(LogicKind::Symbolic)
            .with_symbolic_tag("vision→parse")
            .with_plasticity(hebbian(0.01)),
    )?;

    let pulse = field.node(eye)?.pulse_value();
    field.transmit(root, pulse)?;

    println!("{}", field.node(parse)?);
    println!("{}", field.root(root)?);
    println!(
        "logic.parse activity={:.3} fires={}",
        field.node(parse)?.activity(),
        field.node(parse)?.should_fire()
    );

    let token = NodeConfig::default()
        .with_kind("embedding")
        .with_owner("llm-agent");
    field.add_bound_node("token.hello", token.clone().with_state(0.75))?;
    let hi = field.add_bound_node("token.hi", token.with_state(0.58))?;
    field.mutate(hi, |s| NodeState::Scalar(s.as_scalar().unwrap_or(0.0) + 3.0))?;

    let report = field.step();
    println!(
        "tick {}: fired={} transmissions={}",
        report.tick,
        report.fired.len(),
        report.transmissions
    );

    if let Some(view) = FieldAdapter::new(&field).registry() {
        println!("registry ({} labels):", view.len());
        for record in view.all_records() {
            let id = record.id.simple().to_string();
            println!(
                "  {:<16} {} {:<10} {:<10} {}",
                record.label,
                &id[..8],
                record.owner,
                record.kind,
                record.state
            );
        }
    }

    field.close()?;
    Ok(())
}

fn run_cycle_demo() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut field = Field::new();
    let a = field.add_node(NodeConfig::default().with_state(1.0))?;
    let b = field.add_node(NodeConfig::default().with_state(1.0))?;
    field.connect(a, b, RootConfig::default().with_label("a → b"))?;
    let back = field.connect(
        b,
        a,
        RootConfig::default()
            .with_label("b → a")
            .with_plasticity(hebbian(-0.05)),
    )?;
    field.inject(a, 1.0)?;

    // The cycle decays as b → a loses weight; each tick moves one hop.
    for report in field.run(12) {
        let fired: Vec<usize> = report.fired.iter().map(|(k, _)| k.index()).collect();
        println!(
            "tick {:>2}: fired={:?} transmissions={}",
            report.tick, fired, report.transmissions
        );
    }
    info!(weight = field.root(back)?.weight(), "cycle demo finished");
    Ok(())
}

fn run_delay_demo() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut field = Field::new();
    let src = field.add_node(NodeConfig::default().with_state(2.0))?;
    let dst = field.add_node(NodeConfig::default().with_threshold(2.0))?;
    field.connect(src, dst, RootConfig::default().with_delay(3))?;
    field.inject(src, 1.0)?;

    for report in field.run(5) {
        println!(
            "tick {}: fired={} delivered={} pending={} dst.activity={:.2}",
            report.tick,
            report.fired.len(),
            report.delivered,
            field.pending_len(),
            field.node(dst)?.activity()
        );
    }
    Ok(())
}

fn run_export(config: RegistryConfig, out: PathBuf) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::open(config)?;
    let view = RegistryView::new(&registry);
    view.export(&out)?;
    println!("Exported {} records to {}", view.len(), out.display());
    Ok(())
}

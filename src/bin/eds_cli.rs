#[cfg(target_arch = "wasm32")]
fn main() {
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("eds_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use eds_engine::geom::{Domain, PointGrid};
    use eds_engine::kernel::{KernelOp, PlaneRef};
    use eds_engine::surface::{
        self, BasePolicy, BuildPlan, EXAMPLE_EQUATIONS, SurfacePoints, SurfaceRequest,
        VertexBudget, example_equation,
    };
    use std::fmt::Write as _;
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};

    const DECIMALS: usize = 6;

    const USAGE: &str = r#"eds_cli (eds-engine)

USAGE:
  eds_cli presets
  eds_cli points [options]
  eds_cli plan [options]
  eds_cli obj --out <path> [options]

COMMANDS:
  presets            List the named example equations
  points             Print the centred point grid, one row per line group
  plan               Print every geometry call the surface build would make
  obj                Write the sampled surface as an OBJ quad mesh

OPTIONS:
  --equation <expr>          Equation in x and y (default: ripple)
  --preset <name>            Use a named example equation
  --domain <x0,x1,y0,y1>     Sampling domain (default: -4,4,-4,4)
  --step <size>              Fixed step size along both axes (default: 1)
  --intervals <nx,ny>        Fixed number of intervals per axis
  --base <policy>            Close into a solid: automatic | xy-plane | minimum
  --offset <value>           Base offset (default: -1)
  --plane <xy|xz|yz>         Sketch plane (default: xy)
  --clamp                    Reduce the resolution to the vertex budget
  --out <path>               Output file (obj: required; others: instead of stdout)
  --overwrite                Overwrite existing output files
  -h, --help                 Show this help
"#;

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "presets" => {
                print_presets();
                Ok(())
            }
            "points" => cmd_points(&mut args),
            "plan" => cmd_plan(&mut args),
            "obj" => cmd_obj(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_presets() {
        for (name, equation) in EXAMPLE_EQUATIONS {
            println!("{name:<12} {equation}");
        }
    }

    struct Options {
        request: SurfaceRequest,
        out: Option<PathBuf>,
        overwrite: bool,
        clamp: bool,
        help: bool,
    }

    fn parse_options(args: &mut Args) -> Result<Options, String> {
        let mut options = Options {
            request: SurfaceRequest::default(),
            out: None,
            overwrite: false,
            clamp: false,
            help: false,
        };
        let mut base: Option<BasePolicy> = None;

        while let Some(arg) = args.next() {
            let request = &mut options.request;
            match arg.as_str() {
                "--equation" => request.equation = args.value("--equation")?,
                "--preset" => {
                    let name = args.value("--preset")?;
                    request.equation = example_equation(&name)
                        .ok_or_else(|| unknown_preset(&name))?
                        .to_owned();
                }
                "--domain" => {
                    let [x_min, x_max, y_min, y_max] =
                        parse_numbers::<4>("--domain", &args.value("--domain")?)?;
                    request.domain = Domain::new(x_min, x_max, y_min, y_max);
                }
                "--step" => {
                    let [step] = parse_numbers::<1>("--step", &args.value("--step")?)?;
                    *request = request.clone().with_step_size(step);
                }
                "--intervals" => {
                    let [x, y] = parse_counts("--intervals", &args.value("--intervals")?)?;
                    *request = request.clone().with_intervals(x, y);
                }
                "--base" => {
                    let value = args.value("--base")?;
                    base = Some(value.parse().map_err(|e| format!("--base: {e}"))?);
                }
                "--offset" => {
                    let [offset] = parse_numbers::<1>("--offset", &args.value("--offset")?)?;
                    request.base_offset = offset;
                }
                "--plane" => request.plane = parse_plane(&args.value("--plane")?)?,
                "--clamp" => options.clamp = true,
                "--out" => options.out = Some(PathBuf::from(args.value("--out")?)),
                "--overwrite" => options.overwrite = true,
                "-h" | "--help" => options.help = true,
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        if let Some(policy) = base {
            let offset = options.request.base_offset;
            options.request = options.request.clone().with_base(policy, offset);
        }

        let budget = VertexBudget::default();
        if budget.exceeds(&options.request) {
            if options.clamp {
                options.request = budget.clamp(&options.request);
            } else {
                eprintln!(
                    "warning: about {:.0} vertices requested (budget {}); pass --clamp to reduce",
                    VertexBudget::estimate(&options.request),
                    budget.max_vertices
                );
            }
        }

        Ok(options)
    }

    fn cmd_points(args: &mut Args) -> Result<(), String> {
        let options = parse_options(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }

        let points = surface::calculate_points(&options.request).map_err(|e| e.to_string())?;
        let text = points_text(&options.request, &points);
        emit(options.out.as_deref(), &text, options.overwrite)?;
        eprintln!("points: {}", points.diagnostics.summary());
        Ok(())
    }

    fn cmd_plan(args: &mut Args) -> Result<(), String> {
        let options = parse_options(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }

        let plan = surface::plan(&options.request).map_err(|e| e.to_string())?;
        let text = plan_text(&plan);
        emit(options.out.as_deref(), &text, options.overwrite)?;

        let construction = &plan.report.construction;
        eprintln!(
            "plan: ops={} sections={} rail_sketches={} lofts={} stitched={} groups={}",
            plan.ops.len(),
            construction.section_count,
            construction.rail_sketch_count,
            construction.loft_count,
            construction.stitched,
            construction.timeline_groups.len()
        );
        Ok(())
    }

    fn cmd_obj(args: &mut Args) -> Result<(), String> {
        let options = parse_options(args)?;
        if options.help {
            print_usage();
            return Ok(());
        }
        let path = options.out.as_deref().ok_or("obj requires --out <path>")?;

        let points = surface::calculate_points(&options.request).map_err(|e| e.to_string())?;
        write_obj_file(path, &points.grid, options.request.has_base, options.overwrite)?;
        eprintln!("wrote {}", path.display());
        eprintln!("obj: {}", points.diagnostics.summary());
        Ok(())
    }

    fn points_text(request: &SurfaceRequest, points: &SurfacePoints) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# eds-engine points");
        let _ = writeln!(out, "equation {}", request.equation);
        let _ = write!(out, "offsets ");
        write_f64(&mut out, points.offsets[0]);
        out.push(' ');
        write_f64(&mut out, points.offsets[1]);
        out.push('\n');
        let _ = write!(out, "min_z ");
        write_f64(&mut out, points.min_z);
        out.push('\n');
        match points.base_level {
            Some(level) => {
                let _ = write!(out, "base_level ");
                write_f64(&mut out, level);
                out.push('\n');
            }
            None => {
                let _ = writeln!(out, "base_level none");
            }
        }
        for warning in &points.diagnostics.warnings {
            let _ = writeln!(out, "warning {warning}");
        }

        let _ = writeln!(out, "rows {}", points.grid.row_count());
        for (idx, row) in points.grid.rows().iter().enumerate() {
            let _ = writeln!(out, "row {idx} {}", row.len());
            for point in row {
                write_vec3_line(&mut out, "p", point.to_array());
            }
        }
        out
    }

    fn plan_text(plan: &BuildPlan) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# eds-engine plan");
        let _ = writeln!(out, "ops {}", plan.ops.len());
        for op in &plan.ops {
            match op {
                KernelOp::CreateSketch { sketch, plane } => {
                    let _ = writeln!(out, "create_sketch s{} {}", sketch.0, plane_name(*plane));
                }
                KernelOp::AddSketchPoint { sketch, point } => {
                    write_vec3_line(&mut out, &format!("add_sketch_point s{}", sketch.0), point.to_array());
                }
                KernelOp::AddLine {
                    sketch,
                    line,
                    start,
                    end,
                } => {
                    let _ = write!(out, "add_line s{} l{} ", sketch.0, line.0);
                    write_point(&mut out, start.to_array());
                    out.push_str(" -> ");
                    write_point(&mut out, end.to_array());
                    out.push('\n');
                }
                KernelOp::FinishSection {
                    sketch,
                    section,
                    mode,
                } => {
                    let _ = writeln!(out, "finish_section s{} c{} {mode:?}", sketch.0, section.0);
                }
                KernelOp::CreateLoft {
                    feature,
                    body,
                    sections,
                    rails,
                } => {
                    let rails: Vec<String> = rails.iter().map(|rail| format!("l{}", rail.0)).collect();
                    let _ = writeln!(
                        out,
                        "create_loft f{} b{} c{} c{} rails [{}]",
                        feature.0,
                        body.0,
                        sections[0].0,
                        sections[1].0,
                        rails.join(" ")
                    );
                }
                KernelOp::Stitch { bodies, tolerance } => {
                    let bodies: Vec<String> = bodies.iter().map(|body| format!("b{}", body.0)).collect();
                    let _ = write!(out, "stitch [{}] ", bodies.join(" "));
                    write_f64(&mut out, *tolerance);
                    out.push('\n');
                }
                KernelOp::CreateTimelineGroup { start, end, name } => {
                    let _ = writeln!(out, "timeline_group {start}..={end} {name}");
                }
            }
        }
        out
    }

    fn plane_name(plane: PlaneRef) -> &'static str {
        match plane {
            PlaneRef::Xy => "XY",
            PlaneRef::Xz => "XZ",
            PlaneRef::Yz => "YZ",
        }
    }

    fn parse_plane(value: &str) -> Result<PlaneRef, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "xy" => Ok(PlaneRef::Xy),
            "xz" => Ok(PlaneRef::Xz),
            "yz" => Ok(PlaneRef::Yz),
            other => Err(format!("--plane: unknown plane `{other}` (expected xy, xz or yz)")),
        }
    }

    fn parse_numbers<const N: usize>(flag: &str, value: &str) -> Result<[f64; N], String> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() != N {
            return Err(format!("{flag}: expected {N} comma separated numbers, got `{value}`"));
        }
        let mut numbers = [0.0; N];
        for (slot, part) in numbers.iter_mut().zip(parts) {
            *slot = part
                .parse::<f64>()
                .map_err(|e| format!("{flag}: `{part}` is not a number ({e})"))?;
        }
        Ok(numbers)
    }

    fn parse_counts(flag: &str, value: &str) -> Result<[u32; 2], String> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        let [x, y] = parts.as_slice() else {
            return Err(format!("{flag}: expected `<nx>,<ny>`, got `{value}`"));
        };
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| format!("{flag}: `{part}` is not a count ({e})"))
        };
        Ok([parse(*x)?, parse(*y)?])
    }

    fn unknown_preset(name: &str) -> String {
        let mut msg = String::new();
        let _ = writeln!(msg, "unknown preset `{name}`\n\navailable presets:");
        for (preset, _) in EXAMPLE_EQUATIONS {
            let _ = writeln!(msg, "  {preset}");
        }
        msg
    }

    fn emit(path: Option<&Path>, text: &str, overwrite: bool) -> Result<(), String> {
        match path {
            Some(path) => {
                write_text_file(path, text, overwrite)?;
                eprintln!("wrote {}", path.display());
                Ok(())
            }
            None => {
                print!("{text}");
                Ok(())
            }
        }
    }

    fn check_target(path: &Path, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }
        Ok(())
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        check_target(path, overwrite)?;
        fs::write(path, text).map_err(|e| format!("write {}: {e}", path.display()))
    }

    /// Quads between neighbouring rows. With a base each row is a closed
    /// loop, so the last point connects back to the first.
    fn write_obj_file(path: &Path, grid: &PointGrid, closed_rows: bool, overwrite: bool) -> Result<(), String> {
        grid.ensure_rectangular().map_err(|e| format!("grid is not rectangular: {e}"))?;
        check_target(path, overwrite)?;

        let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "# eds-engine eds_cli").map_err(|e| format!("write obj: {e}"))?;
        writeln!(w, "o surface").map_err(|e| format!("write obj: {e}"))?;

        for p in grid.points() {
            writeln!(w, "v {} {} {}", p.x, p.y, p.z).map_err(|e| format!("write obj: {e}"))?;
        }

        let cols = grid.rows().first().map_or(0, Vec::len);
        let spans = if closed_rows { cols } else { cols.saturating_sub(1) };
        for i in 0..grid.row_count().saturating_sub(1) {
            for j in 0..spans {
                let next = (j + 1) % cols;
                let a = i * cols + j + 1;
                let b = i * cols + next + 1;
                let c = (i + 1) * cols + next + 1;
                let d = (i + 1) * cols + j + 1;
                writeln!(w, "f {a} {b} {c} {d}").map_err(|e| format!("write obj: {e}"))?;
            }
        }

        w.flush().map_err(|e| format!("flush {}: {e}", path.display()))
    }

    fn quantize_f64(value: f64) -> f64 {
        if value == 0.0 { 0.0 } else { value }
    }

    fn write_f64(out: &mut String, value: f64) {
        let value = quantize_f64(value);
        let _ = write!(out, "{value:.DECIMALS$}");
    }

    fn write_point(out: &mut String, v: [f64; 3]) {
        write_f64(out, v[0]);
        out.push(' ');
        write_f64(out, v[1]);
        out.push(' ');
        write_f64(out, v[2]);
    }

    fn write_vec3_line(out: &mut String, prefix: &str, v: [f64; 3]) {
        let _ = write!(out, "{prefix} ");
        write_point(out, v);
        out.push('\n');
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}

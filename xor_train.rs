use backprop::architecture::load_architecture;
use backprop::config::{load_evolver_config, load_trainer_config};
use backprop::evolver::EvolutionStats;
use backprop::io::{save_training_set, save_weights};
use backprop::trainer::{ExerciseStats, LogListener, TrainingStats};
use backprop::{Context, Evolver, Network, Trainer, TrainingSet};
use log::{error, info};
use std::env;
use std::process;

// XOR over the two low bits of one input byte.
const XOR_PAIRS: [(u8, u8); 4] = [(0x00, 0x00), (0x01, 0x01), (0x02, 0x01), (0x03, 0x00)];

// Default configuration files, relative to the crate root.
const TRAINER_CONFIG: &str = "config/trainer.json";
const EVOLVER_CONFIG: &str = "config/evolver.json";
const ARCHITECTURE: &str = "config/architectures/xor.json";

const RANDOM_GAIN: f64 = 1.0;

fn build_training_set(ctx: &Context) -> backprop::Result<TrainingSet> {
    let mut set = TrainingSet::new(ctx, XOR_PAIRS.len(), 1, 1)?;
    for (i, (x, y)) in XOR_PAIRS.iter().enumerate() {
        set.set_pair(i, &[*x], &[*y])?;
    }
    Ok(set)
}

struct Options {
    weights_path: Option<String>,
    evolve: bool,
    seed: Option<u64>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Options, String> {
    let mut options = Options {
        weights_path: None,
        evolve: false,
        seed: None,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--evolve" => options.evolve = true,
            "--seed" => {
                let value = args.next().ok_or("--seed needs a value")?;
                let seed = value
                    .parse()
                    .map_err(|_| format!("invalid seed: {}", value))?;
                options.seed = Some(seed);
            }
            _ => options.weights_path = Some(arg),
        }
    }
    Ok(options)
}

fn run(options: Options) -> backprop::Result<()> {
    let mut ctx = Context::default();
    // Without --seed, draw one from the time-seeded stream and log it so the
    // run can be repeated.
    let seed = options
        .seed
        .unwrap_or_else(|| u64::from(ctx.rng.next_u32()));
    info!("seed: {}", seed);

    let shape = load_architecture(ARCHITECTURE)?;
    let trainer_config = load_trainer_config(TRAINER_CONFIG)?;
    let evolver_config = load_evolver_config(EVOLVER_CONFIG)?;
    info!("architecture: {}", shape);

    let set = build_training_set(&ctx)?;
    let mut network = Network::with_shape(&ctx, &shape)?;
    network.randomize(&mut ctx.rng, RANDOM_GAIN, seed);

    let mut trainer = Trainer::new(trainer_config);
    trainer.add_listener(Box::new(LogListener::new()));

    let mut training_stats = TrainingStats::default();
    let mut exercise_stats = ExerciseStats::default();

    let error = trainer.train(
        &mut ctx,
        &mut training_stats,
        &mut exercise_stats,
        &mut network,
        &set,
    )?;
    info!("train error: {:.6}", error);

    if options.evolve && error > trainer.config.error_tolerance {
        let mut evolver = Evolver::new(evolver_config);
        evolver.add_listener(Box::new(LogListener::new()));
        let mut evolution_stats = EvolutionStats::default();

        let error = evolver.evolve(
            &mut ctx,
            &mut evolution_stats,
            &mut trainer,
            &mut training_stats,
            &mut exercise_stats,
            &mut network,
            &set,
        )?;
        info!("evolve error: {:.6}", error);
        info!("{}", evolution_stats);
    }

    trainer.exercise(&mut ctx, &mut exercise_stats, &mut network, &set)?;
    info!("{}", training_stats);
    info!("{}", exercise_stats);
    info!("{}", network.stats());

    for (x, y) in set.iter() {
        network.input(x)?;
        network.activate(&mut ctx.rng);
        info!(
            "xor({:02X}) = {:02X} (expected {:02X})",
            x[0],
            network.output()[0],
            y[0]
        );
    }

    if let Some(path) = options.weights_path {
        save_weights(&network, &path)?;
        save_training_set(&set, format!("{}.set", path))?;
        info!("weights saved to {}", path);
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            error!("{}", message);
            eprintln!("usage: xor_train [--evolve] [--seed N] [weights_path]");
            process::exit(2);
        }
    };

    if let Err(err) = run(options) {
        error!("xor_train failed: {}", err);
        process::exit(1);
    }
}

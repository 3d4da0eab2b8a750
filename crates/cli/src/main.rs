//! Demonstration binary for inspecting generator output without a GPU.
//!
//! Prints either the emitted Metal-flavored shader source or the
//! planned dispatch (grid/threadgroup sizes, threadgroup-memory bytes)
//! for a caller-specified GEMM or attention shape.

use clap::{Parser, Subcommand, ValueEnum};

use kernelforge_attention::{AttentionDescriptor, AttentionKernel, AttentionPrecisions, KernelType};
use kernelforge_core::{DeviceProfile, Precision};
use kernelforge_dispatch::{plan_gemm_dispatch, plan_attention_dispatch};
use kernelforge_gemm::{GemmDescriptor, GemmKernel, PrecisionTriple, TransposeState};

#[derive(Parser, Debug)]
#[command(name = "kernelforge", version, about = "Kernel synthesiser and dispatcher inspection tool")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print the planned dispatch (grid/threadgroup sizes) instead of shader source.
    #[arg(long, global = true)]
    dispatch: bool,

    /// Assume a discrete GPU device profile instead of the integrated default.
    #[arg(long, global = true)]
    discrete: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesise a tiled GEMM kernel.
    Gemm {
        #[arg(long)]
        m: u32,
        #[arg(long)]
        n: u32,
        #[arg(long)]
        k: u32,
        #[arg(long, value_enum, default_value_t = CliPrecision::Fp16)]
        precision: CliPrecision,
        #[arg(long, value_enum, default_value_t = CliTranspose::Nn)]
        transpose: CliTranspose,
    },
    /// Synthesise the forward attention kernel for a given shape.
    Attention {
        #[arg(long)]
        r: u32,
        #[arg(long)]
        c: u32,
        #[arg(long)]
        d: u16,
        #[arg(long, value_enum, default_value_t = CliPrecision::Fp16)]
        precision: CliPrecision,
        #[arg(long, value_enum, default_value_t = CliKernelType::Forward)]
        kernel: CliKernelType,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliPrecision {
    Fp32,
    Fp16,
    Bf16,
}

impl From<CliPrecision> for Precision {
    fn from(p: CliPrecision) -> Self {
        match p {
            CliPrecision::Fp32 => Precision::FP32,
            CliPrecision::Fp16 => Precision::FP16,
            CliPrecision::Bf16 => Precision::BF16,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliTranspose {
    Nn,
    Nt,
    Tn,
    Tt,
}

impl From<CliTranspose> for TransposeState {
    fn from(t: CliTranspose) -> Self {
        match t {
            CliTranspose::Nn => TransposeState::NN,
            CliTranspose::Nt => TransposeState::NT,
            CliTranspose::Tn => TransposeState::TN,
            CliTranspose::Tt => TransposeState::TT,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernelType {
    Forward,
    BackwardQuery,
    BackwardKeyValue,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let device_profile = if args.discrete { DeviceProfile::discrete() } else { DeviceProfile::integrated() };

    match args.command {
        Command::Gemm { m, n, k, precision, transpose } => {
            let descriptor = GemmDescriptor::new(m, n, k, PrecisionTriple::uniform(precision.into()))
                .with_transpose(transpose.into());
            let kernel = GemmKernel::synthesize(&descriptor, device_profile)?;

            if args.dispatch {
                let dispatch = plan_gemm_dispatch(&kernel, device_profile)?;
                println!("{dispatch:#?}");
            } else {
                println!("{}", kernel.shader_source());
            }
        }
        Command::Attention { r, c, d, precision, kernel } => {
            let precisions = AttentionPrecisions::uniform(precision.into());
            let kernel_type = match kernel {
                CliKernelType::Forward => KernelType::Forward { store_logsumexp: true },
                CliKernelType::BackwardQuery => KernelType::BackwardQuery { store_derivative_st: true },
                CliKernelType::BackwardKeyValue => KernelType::BackwardKeyValue { store_derivative_st: true },
            };
            if args.dispatch {
                let forward = AttentionKernel::synthesize(&AttentionDescriptor::new(
                    r, c, d, precisions, KernelType::Forward { store_logsumexp: true },
                ))?;
                let backward_query = AttentionKernel::synthesize(&AttentionDescriptor::new(
                    r, c, d, precisions, KernelType::BackwardQuery { store_derivative_st: true },
                ))?;
                let backward_key_value = AttentionKernel::synthesize(&AttentionDescriptor::new(
                    r, c, d, precisions, KernelType::BackwardKeyValue { store_derivative_st: true },
                ))?;
                let plan = plan_attention_dispatch(&forward, &backward_query, &backward_key_value, device_profile)?;
                println!("{plan:#?}");
            } else {
                let descriptor = AttentionDescriptor::new(r, c, d, precisions, kernel_type);
                let attention_kernel = AttentionKernel::synthesize(&descriptor)?;
                println!("{}", attention_kernel.shader_source());
            }
        }
    }

    Ok(())
}

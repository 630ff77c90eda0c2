use std::path::PathBuf;

use anyhow::Result;

use crate::cli::Commands;
use crate::hardware::{collect_full_inventory, Collector, ToolKind, ALL_KINDS};
use crate::output::{default_filename, output_data, print_success, save_json};

pub fn handle_command(collector: &Collector, cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::Disk { format } => {
            let disks = collector.disks().unwrap_or_default();
            output_data(&disks, format)?;
        }
        Commands::Cpu { format } => {
            let cpu_info = collector.cpu().unwrap_or_default();
            output_data(&cpu_info, format)?;
        }
        Commands::Gpu { format } => {
            let gpus = collector.gpu().unwrap_or_default();
            output_data(&gpus, format)?;
        }
        Commands::Memory { human, format } => {
            let memory_info = collector.memory().unwrap_or_default();
            if *human {
                output_data(&memory_info.to_human(), format)?;
            } else {
                output_data(&memory_info, format)?;
            }
        }
        Commands::All { format } => {
            let inventory = collect_full_inventory(collector);
            output_data(&inventory, format)?;
        }
        Commands::Save {
            disk,
            cpu,
            gpu,
            memory,
            filename,
        } => {
            let kinds = selected_kinds(*disk, *cpu, *gpu, *memory);
            let path = save_target(filename.as_ref());
            let inventory = collector.collect_kinds(&kinds);
            save_json(&inventory, &path)?;
            print_success(&format!("Inventory saved to {}", path.display()));
        }
    }
    Ok(())
}

/// Kinds picked by the save flags. No flag means everything.
fn selected_kinds(disk: bool, cpu: bool, gpu: bool, memory: bool) -> Vec<ToolKind> {
    let picked: Vec<ToolKind> = [
        (disk, ToolKind::Disk),
        (cpu, ToolKind::Cpu),
        (gpu, ToolKind::Gpu),
        (memory, ToolKind::Memory),
    ]
    .into_iter()
    .filter_map(|(wanted, kind)| wanted.then_some(kind))
    .collect();

    if picked.is_empty() {
        ALL_KINDS.to_vec()
    } else {
        picked
    }
}

fn save_target(filename: Option<&PathBuf>) -> PathBuf {
    filename.cloned().unwrap_or_else(default_filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_selects_everything() {
        assert_eq!(selected_kinds(false, false, false, false), ALL_KINDS.to_vec());
    }

    #[test]
    fn test_flags_select_subset_in_order() {
        assert_eq!(
            selected_kinds(false, true, false, true),
            vec![ToolKind::Cpu, ToolKind::Memory]
        );
    }

    #[test]
    fn test_save_target() {
        let explicit = PathBuf::from("report.json");
        assert_eq!(save_target(Some(&explicit)), explicit);
        assert!(save_target(None)
            .to_string_lossy()
            .starts_with("archinv_"));
    }
}

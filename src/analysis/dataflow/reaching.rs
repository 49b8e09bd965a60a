//! Reaching definitions and def-use/use-def chains.
//!
//! A definition `d` of `v` *reaches* a point `p` if there is a path from `d` to `p`
//! without another definition of `v`. This is a forward data flow analysis:
//!
//! - `GEN[B]` = the last definition of each variable in B
//! - `KILL[B]` = every definition of a variable that B defines
//! - `OUT[B]` = GEN[B] ∪ (IN[B] − KILL[B])
//!
//! After the fixed point, every block is replayed from its IN set to link each use to
//! the definitions reaching it.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    analysis::{
        dataflow::{
            solver::{solve, Direction, GenKill},
            DefUseChain, InstructionLocation, UseDefChain, UseRole, VariableSites,
        },
        ControlFlowGraph,
    },
    il::{IlInstruction, IlOpcode},
    utils::{graph::NodeId, BitSet},
};

/// A definition site.
struct Definition {
    location: InstructionLocation,
    variable: String,
}

/// Chains produced by [`reaching_definitions`].
pub(crate) struct Chains {
    pub(crate) def_use: Vec<DefUseChain>,
    pub(crate) use_def: Vec<UseDefChain>,
    pub(crate) variables: BTreeMap<String, VariableSites>,
}

/// The variable uses of `instruction`, with their roles.
///
/// The defined operand is not a use. Labels, constants, registers and memory locations
/// are not tracked.
pub(crate) fn instruction_uses(instruction: &IlInstruction) -> Vec<(String, UseRole)> {
    let first = instruction.first_read_operand();
    instruction
        .operands
        .iter()
        .enumerate()
        .skip(first)
        .filter_map(|(position, operand)| {
            let key = operand.variable_key()?;
            let role = match (instruction.opcode, position) {
                (IlOpcode::BranchIfTrue | IlOpcode::BranchIfFalse, 0) => UseRole::BranchCondition,
                (IlOpcode::LoadArray, 2) | (IlOpcode::StoreArray, 1) => UseRole::ArrayIndex,
                (IlOpcode::Call, p) if p > 0 => UseRole::CallArgument,
                (IlOpcode::Return, 0) => UseRole::ReturnValue,
                _ => UseRole::PlainRead,
            };
            Some((key, role))
        })
        .collect()
}

/// The variable written by `instruction`, if it is tracked.
pub(crate) fn instruction_def(instruction: &IlInstruction) -> Option<String> {
    instruction.definition().and_then(|value| value.variable_key())
}

/// Computes def-use and use-def chains over the reachable blocks of `cfg`.
pub(crate) fn reaching_definitions(cfg: &ControlFlowGraph, reachable: &[NodeId]) -> Chains {
    let mut definitions: Vec<Definition> = Vec::new();
    let mut variables: BTreeMap<String, VariableSites> = BTreeMap::new();

    for &block_id in reachable {
        let Some(block) = cfg.block(block_id) else {
            continue;
        };
        for (index, instruction) in block.indexed_instructions() {
            let location = InstructionLocation::new(block_id, index);
            for (variable, _) in instruction_uses(instruction) {
                variables.entry(variable).or_default().uses.insert(location);
            }
            if let Some(variable) = instruction_def(instruction) {
                variables
                    .entry(variable.clone())
                    .or_default()
                    .definitions
                    .insert(location);
                definitions.push(Definition { location, variable });
            }
        }
    }

    let universe = definitions.len();
    let mut defs_of: BTreeMap<&str, BitSet> = BTreeMap::new();
    for (id, def) in definitions.iter().enumerate() {
        defs_of
            .entry(def.variable.as_str())
            .or_insert_with(|| BitSet::new(universe))
            .insert(id);
    }
    let def_id: BTreeMap<InstructionLocation, usize> = definitions
        .iter()
        .enumerate()
        .map(|(id, def)| (def.location, id))
        .collect();

    let block_count = cfg.block_count();
    let mut problem = GenKill {
        gen: vec![BitSet::new(universe); block_count],
        kill: vec![BitSet::new(universe); block_count],
    };
    for (id, def) in definitions.iter().enumerate() {
        let b = def.location.block.index();
        if let Some(all) = defs_of.get(def.variable.as_str()) {
            problem.gen[b].difference_with(all);
            problem.kill[b].union_with(all);
        }
        problem.gen[b].insert(id);
    }

    let solution = solve(cfg, Direction::Forward, universe, &problem);

    let mut def_uses: Vec<BTreeSet<InstructionLocation>> = vec![BTreeSet::new(); universe];
    let mut use_def = Vec::new();

    for &block_id in reachable {
        let Some(block) = cfg.block(block_id) else {
            continue;
        };
        let mut current = solution.entry[block_id.index()].clone();

        for (index, instruction) in block.indexed_instructions() {
            let location = InstructionLocation::new(block_id, index);

            for (variable, role) in instruction_uses(instruction) {
                let mut reaching = BTreeSet::new();
                if let Some(candidates) = defs_of.get(variable.as_str()) {
                    for id in current.iter().filter(|id| candidates.contains(*id)) {
                        reaching.insert(definitions[id].location);
                        def_uses[id].insert(location);
                    }
                }
                use_def.push(UseDefChain {
                    location,
                    variable,
                    role,
                    definitions: reaching,
                });
            }

            if let Some(variable) = instruction_def(instruction) {
                if let Some(all) = defs_of.get(variable.as_str()) {
                    current.difference_with(all);
                }
                if let Some(&id) = def_id.get(&location) {
                    current.insert(id);
                }
            }
        }
    }

    let def_use = definitions
        .into_iter()
        .zip(def_uses)
        .map(|(def, uses)| DefUseChain {
            definition: def.location,
            variable: def.variable,
            uses,
        })
        .collect();

    Chains {
        def_use,
        use_def,
        variables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{FunctionBuilder, IlType, IlValue};

    fn loc(block: usize, index: usize) -> InstructionLocation {
        InstructionLocation::new(NodeId::new(block), index)
    }

    #[test]
    fn test_use_roles() {
        let mut builder = FunctionBuilder::new("roles");
        builder
            .load_array(IlValue::temp(0), IlValue::global("buf", IlType::Byte), IlValue::temp(1))
            .branch_if_true(IlValue::temp(0), "x")
            .label("x")
            .call("putc", vec![IlValue::temp(0)], None)
            .ret(Some(IlValue::temp(0)));
        let function = builder.build();
        let roles: Vec<UseRole> = function
            .instructions
            .iter()
            .flat_map(|i| instruction_uses(i).into_iter().map(|(_, role)| role))
            .collect();

        assert_eq!(
            roles,
            vec![
                UseRole::PlainRead,
                UseRole::ArrayIndex,
                UseRole::BranchCondition,
                UseRole::CallArgument,
                UseRole::ReturnValue
            ]
        );
    }

    #[test]
    fn test_redefinition_kills() {
        let x = IlValue::local("x", IlType::Byte);
        let mut builder = FunctionBuilder::new("kill");
        builder
            .store_variable(x.clone(), IlValue::byte(1))
            .store_variable(x.clone(), IlValue::byte(2))
            .load_variable(IlValue::temp(0), x)
            .ret(None);
        let cfg = ControlFlowGraph::build(&builder.build());
        let chains = reaching_definitions(&cfg, &cfg.reverse_postorder());

        let x_use = chains
            .use_def
            .iter()
            .find(|u| u.variable == "x")
            .map(|u| u.definitions.clone());
        assert_eq!(x_use, Some(BTreeSet::from([loc(0, 1)])));
        assert!(chains.def_use[0].uses.is_empty());
        assert_eq!(chains.def_use[1].uses, BTreeSet::from([loc(0, 2)]));
    }

    #[test]
    fn test_definitions_merge_at_join() {
        let x = IlValue::local("x", IlType::Byte);
        let mut builder = FunctionBuilder::new("join");
        builder
            .branch_if_false(IlValue::temp(0), "else")
            .store_variable(x.clone(), IlValue::byte(1))
            .branch("end")
            .label("else")
            .store_variable(x.clone(), IlValue::byte(2))
            .label("end")
            .ret(Some(x));
        let cfg = ControlFlowGraph::build(&builder.build());
        let chains = reaching_definitions(&cfg, &cfg.reverse_postorder());

        let ret = chains
            .use_def
            .iter()
            .find(|u| u.role == UseRole::ReturnValue)
            .map(|u| u.definitions.len());
        assert_eq!(ret, Some(2));
        assert_eq!(chains.variables["x"].definitions.len(), 2);
    }
}

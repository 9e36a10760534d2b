// Grafo de prerequisitos e importancia de cada curso.
//
// Las aristas van de prerequisito a curso ("desbloquea"). La importancia de
// un curso es 1 + número de cursos que lo requieren de forma transitiva.
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use tracing::{debug, warn};

use crate::models::Catalog;

/// Importancia por código de curso. Cursos desconocidos valen 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportanceScores(BTreeMap<String, u32>);

impl ImportanceScores {
    pub fn get(&self, code: &str) -> u32 {
        self.0.get(code).copied().unwrap_or(1)
    }
}

pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Construye el grafo del catálogo. Prerequisitos que no están en el
    /// catálogo se ignoran (hojas externas).
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::new();

        for code in catalog.codes() {
            let idx = graph.add_node(code.to_string());
            node_map.insert(code.to_string(), idx);
        }

        for course in catalog.courses() {
            let Some(&to) = node_map.get(&course.code) else { continue };
            for prereq in &course.prerequisites {
                match node_map.get(prereq) {
                    Some(&from) => {
                        if graph.find_edge(from, to).is_none() {
                            graph.add_edge(from, to, ());
                        }
                    }
                    None => warn!("prerequisito {} de {} no está en el catálogo", prereq, course.code),
                }
            }
        }

        DependencyGraph { graph, node_map }
    }

    /// Devuelve un ciclo de prerequisitos si existe (miembros de la primera
    /// componente fuertemente conexa no trivial, o un auto-prerequisito).
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        if toposort(&self.graph, None).is_ok() {
            return None;
        }
        for scc in tarjan_scc(&self.graph) {
            let self_loop = scc.len() == 1 && self.graph.find_edge(scc[0], scc[0]).is_some();
            if scc.len() > 1 || self_loop {
                let mut names: Vec<String> = scc.iter().map(|i| self.graph[*i].clone()).collect();
                names.sort();
                if let Some(first) = names.first().cloned() {
                    names.push(first);
                }
                return Some(names);
            }
        }
        None
    }

    /// `ancestor` se alcanza desde `course` siguiendo prerequisitos.
    pub fn is_dependent(&self, course: &str, ancestor: &str) -> bool {
        if course == ancestor {
            return false;
        }
        match (self.node_map.get(ancestor), self.node_map.get(course)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Todos los cursos que requieren `target` de forma transitiva.
    pub fn all_dependents(&self, target: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let Some(&start) = self.node_map.get(target) else { return out };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(n) = dfs.next(&self.graph) {
            if n != start {
                out.insert(self.graph[n].clone());
            }
        }
        out
    }

    /// Cursos para los que `code` es prerequisito directo.
    pub fn unlocks(&self, code: &str) -> Vec<String> {
        let Some(&idx) = self.node_map.get(code) else { return Vec::new() };
        let mut out: Vec<String> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }

    /// Importancia de todos los cursos. En un grafo acíclico se calcula con
    /// una sola pasada en orden topológico inverso; si hay ciclos se recorre
    /// curso a curso.
    pub fn importance(&self) -> ImportanceScores {
        let mut scores = BTreeMap::new();
        match toposort(&self.graph, None) {
            Ok(order) => {
                let mut below: HashMap<NodeIndex, HashSet<NodeIndex>> = HashMap::new();
                for &n in order.iter().rev() {
                    let mut set = HashSet::new();
                    for child in self.graph.neighbors_directed(n, Direction::Outgoing) {
                        set.insert(child);
                        if let Some(grand) = below.get(&child) {
                            set.extend(grand.iter().copied());
                        }
                    }
                    scores.insert(self.graph[n].clone(), set.len() as u32 + 1);
                    below.insert(n, set);
                }
            }
            Err(_) => {
                debug!("grafo con ciclos: importancia por DFS individual");
                for (code, _) in &self.node_map {
                    scores.insert(code.clone(), self.all_dependents(code).len() as u32 + 1);
                }
            }
        }
        ImportanceScores(scores)
    }
}

/// True si `ancestor` se alcanza desde `course` siguiendo aristas de
/// prerequisito. DFS con conjunto de visitados: termina aunque el catálogo
/// tenga ciclos. Un curso nunca depende de sí mismo.
pub fn is_dependent(course: &str, ancestor: &str, catalog: &Catalog) -> bool {
    if course == ancestor {
        return false;
    }
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![course];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let Some(c) = catalog.get(current) else { continue };
        for prereq in &c.prerequisites {
            if prereq == ancestor {
                return true;
            }
            stack.push(prereq);
        }
    }
    false
}

pub fn all_dependents(target: &str, catalog: &Catalog) -> BTreeSet<String> {
    catalog
        .codes()
        .filter(|c| is_dependent(c, target, catalog))
        .map(str::to_string)
        .collect()
}

/// importancia = |dependientes transitivos| + 1 para cada curso del catálogo.
pub fn assign_importance(catalog: &Catalog) -> ImportanceScores {
    DependencyGraph::from_catalog(catalog).importance()
}

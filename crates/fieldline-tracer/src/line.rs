//! The adaptive field-line integrator.
//!
//! A [`FieldLine`] is built by integrating the normalized direction field
//! with fourth-order Runge-Kutta steps whose size adapts to a step-halving
//! error estimate. The smooth march is interrupted wherever the direction
//! field stops being smooth: near monopoles and dipoles the step logic
//! switches to dedicated capture and traversal transitions, near direction
//! discontinuities a corner is bracketed with a root solve, and a path
//! returning to its seed is closed into a loop.

use crate::diagnostics::TraceEvent;
use crate::options::{BoundaryFn, Direction, TraceOptions};
use fieldline_core::roots::brent;
use fieldline_core::vec2::{angle_dif, cos_between, sin_between};
use fieldline_core::Vec2;
use fieldline_sources::{Field, Pole, PoleKind};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Step error tolerance of the integrator.
const ERR: f64 = 4e-8;
/// Curvature change rate (rad per unit length squared) above which the
/// direction field is assumed to have a corner.
const CORNER_LIMIT: f64 = 1e4;
/// Tolerance handed to every root solve of the tracer.
pub(crate) const ROOT_XTOL: f64 = 1e-6;
pub(crate) const ROOT_MAXITER: usize = 100;

/// One support point of an integrated line.
///
/// `v_in` and `v_out` are tangents scaled by the local step size; `v_in`
/// of the first and `v_out` of the last node are absent. At a corner node
/// the two tangents point in different directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub p: Vec2,
    pub v_in: Option<Vec2>,
    pub v_out: Option<Vec2>,
    pub corner: bool,
    /// Normalized cumulative arc length, 0 at the first node, 1 at the last.
    pub t: f64,
}

impl Node {
    fn new(p: Vec2, v_in: Option<Vec2>) -> Self {
        Self {
            p,
            v_in,
            v_out: None,
            corner: false,
            t: 0.0,
        }
    }
}

/// An integrated field line, immutable after construction.
pub struct FieldLine {
    pub(crate) nodes: Vec<Node>,
    pub(crate) events: Vec<TraceEvent>,
    pub(crate) bounds_func: Option<BoundaryFn>,
}

impl std::fmt::Debug for FieldLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldLine")
            .field("nodes", &self.nodes.len())
            .field("events", &self.events)
            .finish()
    }
}

/// What the nearest singular point is.
enum NearKind {
    Start,
    Monopole,
    Dipole(Vec2),
}

struct Nearest {
    kind: NearKind,
    xy: Vec2,
}

struct Integrator<'a> {
    field: &'a Field,
    poles: Vec<Pole>,
    start_p: Vec2,
    first_point: Vec2,
    start_v: Option<Vec2>,
    start_d: Option<Vec2>,
    maxn: usize,
    maxr: f64,
    hmax: f64,
    pass_dipoles: i32,
    path_close_tol: f64,
    stop_funcs: [Option<BoundaryFn>; 2],
    events: Vec<TraceEvent>,
}

fn record(events: &mut Vec<TraceEvent>, event: TraceEvent) {
    event.emit();
    events.push(event);
}

/// One fourth-order Runge-Kutta step; returns the new position and the
/// largest direction spread among the stage evaluations (a cheap measure
/// of how non-smooth the direction field was across the step).
fn rk_step<F>(p: Vec2, v: Vec2, f: &F, h: f64) -> (Vec2, f64)
where
    F: Fn(Vec2) -> Vec2,
{
    let k1 = v * h;
    let v2 = f(p + k1 * 0.5);
    let k2 = v2 * h;
    let v3 = f(p + k2 * 0.5);
    let k3 = v3 * h;
    let v4 = f(p + k3);
    let k4 = v4 * h;
    let p1 = p + (k1 + (k2 + k3) * 2.0 + k4) * (1.0 / 6.0);
    let verr = (v - v2)
        .norm()
        .max((v - v3).norm())
        .max((v - v4).norm())
        .max((v2 - v3).norm())
        .max((v3 - v4).norm())
        .max((v4 - v2).norm());
    (p1, verr)
}

impl<'a> Integrator<'a> {
    /// Weighted nearest singular point; poles behind the travel direction
    /// count 2.3 times as distant, poles straight ahead 0.3 times.
    fn nearest_pole(&self, p: Vec2, v: Vec2) -> Nearest {
        let to_start = self.first_point - p;
        let mut d_near = to_start.norm() * (1.3 - cos_between(&v, &to_start));
        let mut nearest = Nearest {
            kind: NearKind::Start,
            xy: self.first_point,
        };
        for pole in &self.poles {
            let to_pole = pole.position - p;
            let d = to_pole.norm() * (1.3 - cos_between(&v, &to_pole));
            if d < d_near {
                d_near = d;
                nearest = Nearest {
                    kind: match pole.kind {
                        PoleKind::Monopole => NearKind::Monopole,
                        PoleKind::Dipole { moment } => NearKind::Dipole(moment),
                    },
                    xy: pole.position,
                };
            }
        }
        nearest
    }

    /// Integrate from the start point to one end of the line.
    fn trace_part(&mut self, sign: f64) -> Vec<Node> {
        let field = self.field;
        let f = move |r: Vec2| field.direction(r) * sign;

        let mut p = self.start_p;
        let mut v = match self.start_v {
            Some(sv) => sv.normalized() * sign,
            None => f(p),
        };
        let mut nodes = vec![Node::new(p, None)];

        let xtol = 20.0 * ERR;
        let ytol = self.path_close_tol;

        let mut h = (5.0f64.sqrt() - 1.0) / 10.0;
        let mut h_old = h;
        let mut l = 0.0;
        let mut i = 0;
        let mut pass_dipoles = self.pass_dipoles;

        'integrate: while i < self.maxn && l < self.maxr {
            i += 1;
            if let Some(d) = self.start_d.filter(|_| nodes.len() == 1) {
                // start from a dipole: the first step goes exactly along d
                h = d.norm();
                p = p + d;
                v = f(p);
                nodes[0].v_out = Some((d.normalized() * 2.0 - v).normalized() * h);
                nodes.push(Node::new(p, Some(v * h)));
            } else if nodes.len() > 1 {
                let near = self.nearest_pole(p, v);
                let mut vpole = near.xy - p;
                let dpole = vpole.norm();
                vpole = vpole * (1.0 / dpole);

                let cv = cos_between(&v, &vpole);
                let sv = sin_between(&v, &vpole);
                if (dpole < 0.1 || h >= dpole) && (cv > 0.9 || dpole < ytol) {
                    // heading for a known special point
                    if matches!(near.kind, NearKind::Start) {
                        // is the fieldline about to be closed?
                        if dpole * sv.abs() < ytol && dpole * cv.abs() < xtol && l > 1e-3 {
                            let last = nodes.len() - 1;
                            nodes[last].v_out = None;
                            record(&mut self.events, TraceEvent::ClosedLoop { at: p });
                            break 'integrate;
                        } else if h > 0.99 * dpole
                            && (cv > 0.9 || (cv > 0.0 && dpole * sv.abs() < ytol))
                        {
                            // slow down on the final approach
                            h = (4.0 * ERR).max(dpole * cv * 0.9f64.max(1.0 - 0.1 * dpole * cv));
                        }
                    }

                    if matches!(near.kind, NearKind::Monopole) && dpole < 0.01 && cv > 0.996 {
                        // approaching a monopole: end the line on the pole
                        // with a cubic-profile tangent
                        let last = nodes.len() - 1;
                        nodes[last].v_out = Some(v.normalized() * dpole);
                        let vp = (vpole * 1.5 - v.normalized() * 0.5).normalized();
                        nodes.push(Node::new(near.xy, Some(vp * dpole)));
                        l += h;
                        record(&mut self.events, TraceEvent::MonopoleReached { at: near.xy });
                        break 'integrate;
                    }

                    if let NearKind::Dipole(moment) = near.kind {
                        if dpole < 0.01 && cv > 0.996 {
                            // approaching a dipole: reflect across its axis
                            // and carry a zero-width pole node
                            let m = (moment * sign).normalized();
                            let last = nodes.len() - 1;
                            p = nodes[last].p + m * (2.0 * m.dot(&vpole) * dpole);
                            nodes[last].v_out = Some(v.normalized() * (2.0 * dpole));
                            let mut pole_node = Node::new(near.xy, Some(Vec2::ZERO));
                            pole_node.v_out = Some(Vec2::ZERO);
                            nodes.push(pole_node);
                            l += h;
                            record(&mut self.events, TraceEvent::DipoleReached { at: near.xy });
                            // is the path being closed right here?
                            let v_end = self.first_point - p;
                            if dpole * sin_between(&v, &v_end).abs() < ytol
                                && dpole * cos_between(&v, &v_end).abs() < xtol
                                && l > 1e-3
                            {
                                let last = nodes.len() - 1;
                                nodes[last].v_out = None;
                                record(&mut self.events, TraceEvent::ClosedLoop { at: p });
                                break 'integrate;
                            }
                            if pass_dipoles == 0 {
                                let last = nodes.len() - 1;
                                nodes[last].v_out = None;
                                break 'integrate;
                            }
                            if pass_dipoles > 0 {
                                pass_dipoles -= 1;
                            }
                            v = f(p);
                            nodes.push(Node::new(p, Some(v.normalized() * (2.0 * dpole))));
                            l += h;
                            continue 'integrate;
                        }
                    }
                } else if h < 0.01 {
                    // no special point nearby but the step is small: check
                    // the change rate of the curvature
                    let hh = h * 3.0;
                    let v0 = f(p + v * (hh / 2.0));
                    let v1 = f(p + v * hh);
                    let a0 = angle_dif(v0.angle(), v.angle());
                    let a1 = angle_dif(v1.angle(), v0.angle());
                    let adif = angle_dif(a1, a0);
                    if adif.abs() / (hh * hh) > CORNER_LIMIT {
                        // assume a corner in the direction field here
                        let (h0, h1, vm) = if a0.abs() >= a1.abs() {
                            (0.0, hh / 2.0, (v.normalized() + v0.normalized()).normalized())
                        } else {
                            (hh / 2.0, hh, (v0.normalized() + v1.normalized()).normalized())
                        };
                        let vm = if vm.norm() == 0.0 {
                            v0.perp().normalized()
                        } else {
                            vm
                        };
                        let mut hc =
                            brent(|hc| sin_between(&f(p + v * hc), &vm), h0, h1, ROOT_XTOL, ROOT_MAXITER)
                                .unwrap_or(0.5 * (h0 + h1));
                        let v2 = f(p + v * (hc / 2.0));
                        if sin_between(&f(p), &vm) * sin_between(&f(p + v2 * (2.0 * hc)), &vm)
                            <= 0.0
                        {
                            hc = brent(
                                |t| sin_between(&f(p + v2 * t), &vm),
                                0.0,
                                2.0 * hc,
                                ROOT_XTOL,
                                ROOT_MAXITER,
                            )
                            .unwrap_or(hc);
                        }
                        let last = nodes.len() - 1;
                        nodes[last].v_out =
                            Some(nodes[last].v_in.unwrap_or(Vec2::ZERO).normalized() * hc);
                        // place the corner with second-order formulas
                        // instead of a Runge-Kutta step
                        p = p + v2 * hc;
                        record(&mut self.events, TraceEvent::CornerAt { at: p });
                        v = (v2 * 2.0 - v).normalized();
                        let mut corner_node = Node::new(p, Some(v * hc));
                        corner_node.corner = true;
                        nodes.push(corner_node);
                        l += h;
                        // is the path being closed right here?
                        let v_end = self.first_point - p;
                        if dpole * sin_between(&v, &v_end).abs() < ytol
                            && dpole * cos_between(&v, &v_end).abs() < xtol
                            && l > 1e-3
                        {
                            let last = nodes.len() - 1;
                            nodes[last].v_out = None;
                            record(&mut self.events, TraceEvent::ClosedLoop { at: p });
                            break 'integrate;
                        }
                        // probe the area right after the corner; the probe
                        // lengths are chosen to keep corner detection alive
                        let p0 = p + f(p + v1 * (hh * 0.2)) * (hh * 0.2);
                        let va0 = f(p0);
                        let pa1 = p0 + va0 * (hh * 0.4);
                        let va1 = f(pa1);
                        let pa2 = pa1 + va1 * (hh * 0.4);
                        let va2 = f(pa2);
                        let a0 = angle_dif(va1.angle(), va0.angle());
                        let a1 = angle_dif(va2.angle(), va1.angle());
                        let adif = angle_dif(a1, a0);
                        if adif.abs() / (0.8 * hh).powi(2) > CORNER_LIMIT
                            || a0.abs() + a1.abs() >= PI / 2.0
                        {
                            // the direction turns again right away: end edge
                            let last = nodes.len() - 1;
                            nodes[last].v_out = None;
                            record(&mut self.events, TraceEvent::EndEdge { at: p });
                            break 'integrate;
                        }
                        // one guided micro-step past the corner, then
                        // resume regular integration
                        let vm = (va1 * 1.25 - va2 * 0.25).normalized();
                        v = f(p + vm * hh);
                        let last = nodes.len() - 1;
                        nodes[last].v_out = Some((vm * 2.0 - v).normalized() * hh);
                        p = p + vm * hh;
                        nodes.push(Node::new(p, Some(v * hh)));
                        l += h;
                    }
                }
            }

            // single and double Runge-Kutta step
            let (p11, e11) = rk_step(p, v, &f, h);
            let (p21, e21) = rk_step(p, v, &f, h / 2.0);
            let (p22, e22) = rk_step(p21, f(p21), &f, h / 2.0);
            let rkv_err = e11.max(e21).max(e22);
            let diff = (p22 - p11).norm();
            if diff < 2.0 * ERR && rkv_err < 0.1 {
                // accept the step, Richardson-extrapolated
                p = (p22 * 16.0 - p11) * (1.0 / 15.0);
                let last = nodes.len() - 1;
                nodes[last].v_out = Some(v.normalized() * h);
                v = f(p);
                if v.norm() == 0.0 {
                    // the field vanished, the line is stuck
                    nodes[last].v_out = None;
                    record(&mut self.events, TraceEvent::ZeroField { at: p });
                    break 'integrate;
                }
                if nodes.len() >= 2 && (nodes[last].p - nodes[last - 1].p).norm() == 0.0 {
                    if h > 2.0 * ERR {
                        h /= 7.0;
                    } else {
                        // the position no longer moves at the smallest step
                        nodes.pop();
                        let last = nodes.len() - 1;
                        nodes[last].v_out = None;
                        record(&mut self.events, TraceEvent::Stalled { at: p });
                        break 'integrate;
                    }
                }
                nodes.push(Node::new(p, Some(v * h)));
                l += h;
            }

            // clip at the prohibited area
            let stop_idx = if sign < 0.0 { 0 } else { 1 };
            if let Some(stop) = &self.stop_funcs[stop_idx] {
                if stop(nodes[nodes.len() - 1].p) > 0.0 {
                    while nodes.len() > 1 && stop(nodes[nodes.len() - 2].p) > 0.0 {
                        nodes.pop();
                    }
                    if nodes.len() > 1 {
                        let pa = nodes[nodes.len() - 2].p;
                        let pb = nodes[nodes.len() - 1].p;
                        let tc = brent(
                            |t| stop(pa + (pb - pa) * t),
                            0.0,
                            1.0,
                            ROOT_XTOL,
                            ROOT_MAXITER,
                        )
                        .unwrap_or(0.0);
                        let pc = pa + (pb - pa) * tc;
                        let hc = (pc - pa).norm();
                        let last = nodes.len() - 1;
                        nodes[last].p = pc;
                        nodes[last - 1].v_out = Some(f(pa) * hc);
                        nodes[last].v_in = Some(f(pc) * hc);
                    }
                    let at = nodes[nodes.len() - 1].p;
                    record(&mut self.events, TraceEvent::Stopped { at });
                    break 'integrate;
                }
            }

            // adapt the step carefully
            if rkv_err >= 0.1 {
                h *= 0.5;
            } else if diff > 0.0 {
                let factor = (ERR / diff).powf(0.25);
                let h_new = if h < h_old {
                    ((h + h_old) / 2.0).min(h * factor)
                } else {
                    h * factor.max(0.5)
                };
                h_old = h;
                h = h_new;
            } else {
                h_old = h;
                h *= 2.0;
            }
            h = h.max(ERR).min(self.hmax);
        }

        let last = nodes.len() - 1;
        nodes[last].v_out = None;
        if i == self.maxn {
            record(
                &mut self.events,
                TraceEvent::StepBudgetExceeded { steps: self.maxn, at: p },
            );
        }
        if l >= self.maxr {
            record(&mut self.events, TraceEvent::RangeExceeded { range: self.maxr, at: p });
        }
        nodes
    }

    /// Compose the requested direction(s) into one node list.
    fn build_nodes(&mut self, direction: Direction) -> Vec<Node> {
        let mut nodes = match direction {
            Direction::Forward => self.trace_part(1.0),
            Direction::Backward | Direction::Both => {
                let mut part = self.trace_part(-1.0);
                part.reverse();
                for node in part.iter_mut() {
                    let old_out = node.v_out;
                    node.v_out = node.v_in.map(|t| -t);
                    node.v_in = old_out.map(|t| -t);
                }
                if let Some(first) = part.first() {
                    self.first_point = first.p;
                }
                if direction == Direction::Both && !is_loop(&part, self.path_close_tol) {
                    let forward = self.trace_part(1.0);
                    let last = part.len() - 1;
                    part[last].v_out = forward[0].v_out;
                    part.extend(forward.into_iter().skip(1));
                }
                part
            }
        };

        // cumulative arc length, normalized to [0, 1]
        for i in 1..nodes.len() {
            nodes[i].t = nodes[i - 1].t + (nodes[i - 1].p - nodes[i].p).norm();
        }
        let length = nodes[nodes.len() - 1].t;
        if length != 0.0 {
            for node in nodes.iter_mut().skip(1) {
                node.t /= length;
            }
        }
        nodes
    }
}

/// A node list is a loop when its ends coincide and it is not degenerately
/// short.
fn is_loop(nodes: &[Node], path_close_tol: f64) -> bool {
    if (nodes[0].p - nodes[nodes.len() - 1].p).norm() > (5e-4f64).max(path_close_tol) {
        return false;
    }
    let mut length = 0.0;
    for i in 1..nodes.len() {
        length += (nodes[i].p - nodes[i - 1].p).norm();
        if length > 5e-3 {
            return true;
        }
    }
    false
}

/// Locate the node interval containing parameter `t`; returns the interval
/// index and the fractional position inside it.
pub(crate) fn segment_at(nodes: &[Node], t: f64) -> (usize, f64) {
    let n = nodes.len();
    let (mut idx, mut frac);
    if t < nodes[0].t {
        idx = 0;
        frac = 0.0;
    } else if t > nodes[n - 1].t {
        idx = n - 1;
        frac = 0.0;
    } else {
        idx = match nodes.binary_search_by(|node| node.t.total_cmp(&t)) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let dt = if idx + 1 < n {
            nodes[idx + 1].t - nodes[idx].t
        } else {
            0.0
        };
        frac = if dt > 0.0 { (t - nodes[idx].t) / dt } else { 0.0 };
    }
    if idx > 0 && idx >= n - 1 {
        frac += (idx - (n - 2)) as f64;
        idx = n - 2;
    }
    (idx, frac)
}

impl FieldLine {
    /// Trace a field line of `field` from `start`.
    ///
    /// Construction runs the integration to completion; the node list of
    /// the returned line is immutable. All terminal outcomes are normal:
    /// inspect [`FieldLine::events`] for what ended the line.
    pub fn trace(field: &Field, start: Vec2, options: TraceOptions) -> Self {
        let TraceOptions {
            start_v,
            start_d,
            direction,
            maxn,
            maxr,
            hmax,
            pass_dipoles,
            path_close_tol,
            bounds_func,
            stop_funcs,
        } = options;
        let mut integrator = Integrator {
            field,
            poles: field.poles(),
            start_p: start,
            first_point: start,
            start_v,
            start_d,
            maxn,
            maxr,
            hmax,
            pass_dipoles,
            path_close_tol,
            stop_funcs,
            events: Vec::new(),
        };
        let nodes = integrator.build_nodes(direction);
        Self {
            nodes,
            events: integrator.events,
            bounds_func,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Everything noteworthy that happened during integration, in order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Dense output: cubic-Hermite position at normalized arc length `t`.
    /// Arguments outside [0, 1] wrap around (except t = 1 itself).
    pub fn get_position(&self, t: f64) -> Vec2 {
        if self.nodes.len() <= 1 {
            return self.nodes.first().map_or(Vec2::ZERO, |n| n.p);
        }
        let t = if t != 1.0 { t.rem_euclid(1.0) } else { t };
        let (n, frac) = segment_at(&self.nodes, t);
        let p0 = self.nodes[n].p;
        let v0 = self.nodes[n].v_out.unwrap_or(Vec2::ZERO);
        let p1 = self.nodes[n + 1].p;
        let v1 = self.nodes[n + 1].v_in.unwrap_or(Vec2::ZERO);
        let q = 1.0 - frac;
        p0 * q + p1 * frac + ((p1 - p0) * (frac - q) + (v0 * q - v1 * frac)) * (frac * q)
    }
}

//! Pure-Rust reference models exercised against kernelforge's public API.
//!
//! No GPU driver is available here, so these reference implementations
//! don't substitute for running the emitted shaders: they validate that
//! the synthesiser's tiling and blocking metadata stays consistent with
//! the formulas it claims to implement (block-count coverage, edge-shift
//! arithmetic, `leadingDimensionDerivativeST` alignment), and that the
//! closed-form Laplacian and direct-softmax derivations used by the
//! integration tests are themselves correct.

/// Row-major dense matmul, `C = A (MxK) * B (KxN)`.
pub fn reference_matmul(a: &[f64], b: &[f64], m: usize, n: usize, k: usize) -> Vec<f64> {
    let mut c = vec![0.0f64; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            if a_ip == 0.0 {
                continue;
            }
            for j in 0..n {
                c[i * n + j] += a_ip * b[p * n + j];
            }
        }
    }
    c
}

/// The 2nd-order periodic Laplacian, `n x n`: `A_{i,i} = -2`,
/// `A_{i,(i +/- 1) mod n} = 1`, zero elsewhere.
pub fn periodic_laplacian(n: usize) -> Vec<f64> {
    let mut a = vec![0.0f64; n * n];
    for i in 0..n {
        a[i * n + i] = -2.0;
        a[i * n + (i + 1) % n] += 1.0;
        a[i * n + (i + n - 1) % n] += 1.0;
    }
    a
}

/// Closed-form `A * B` for `A` the periodic Laplacian: row `m` of the
/// product is `B[(m-1) mod n] - 2*B[m] + B[(m+1) mod n]`.
pub fn laplacian_closed_form(b: &[f64], n: usize) -> Vec<f64> {
    let mut c = vec![0.0f64; n * n];
    for m in 0..n {
        let prev = (m + n - 1) % n;
        let next = (m + 1) % n;
        for col in 0..n {
            c[m * n + col] = b[prev * n + col] - 2.0 * b[m * n + col] + b[next * n + col];
        }
    }
    c
}

/// Direct (non-streaming) softmax attention forward pass.
///
/// `q` is `r x d`, `k` and `v` are `c x d`, all row-major. Returns
/// `(o, l)`: `o` is `r x d`, `l` is the length-`r` logsumexp row
/// statistic.
pub fn attention_forward(q: &[f64], k: &[f64], v: &[f64], r: usize, c: usize, d: usize) -> (Vec<f64>, Vec<f64>) {
    let scale = 1.0 / (d as f64).sqrt();
    let mut o = vec![0.0f64; r * d];
    let mut l = vec![0.0f64; r];

    for i in 0..r {
        let mut scores = vec![0.0f64; c];
        for j in 0..c {
            let mut dot = 0.0;
            for x in 0..d {
                dot += q[i * d + x] * k[j * d + x];
            }
            scores[j] = dot * scale;
        }
        let row_max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum_exp = 0.0;
        let mut weights = vec![0.0f64; c];
        for j in 0..c {
            let e = (scores[j] - row_max).exp();
            weights[j] = e;
            sum_exp += e;
        }
        l[i] = row_max + sum_exp.ln();
        for j in 0..c {
            let p = weights[j] / sum_exp;
            for x in 0..d {
                o[i * d + x] += p * v[j * d + x];
            }
        }
    }
    (o, l)
}

/// Direct (non-streaming) softmax attention backward pass.
///
/// Recomputes `P` from `q`/`k` rather than reusing `l` directly, matching
/// how the fused backward-key-value kernel recomputes scores from
/// streamed `Q`/`K` tiles instead of caching the full score matrix.
/// Returns `(dq, dk, dv, d_stat)`, where `d_stat[i] = sum_x dO[i,x]*O[i,x]`.
#[allow(clippy::too_many_arguments)]
pub fn attention_backward(
    q: &[f64],
    k: &[f64],
    v: &[f64],
    o: &[f64],
    d_out: &[f64],
    r: usize,
    c: usize,
    d: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let scale = 1.0 / (d as f64).sqrt();
    let mut dq = vec![0.0f64; r * d];
    let mut dk = vec![0.0f64; c * d];
    let mut dv = vec![0.0f64; c * d];
    let mut d_stat = vec![0.0f64; r];

    for i in 0..r {
        let mut acc = 0.0;
        for x in 0..d {
            acc += d_out[i * d + x] * o[i * d + x];
        }
        d_stat[i] = acc;
    }

    for i in 0..r {
        let mut scores = vec![0.0f64; c];
        for j in 0..c {
            let mut dot = 0.0;
            for x in 0..d {
                dot += q[i * d + x] * k[j * d + x];
            }
            scores[j] = dot * scale;
        }
        let row_max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum_exp = 0.0;
        let mut p = vec![0.0f64; c];
        for j in 0..c {
            p[j] = (scores[j] - row_max).exp();
            sum_exp += p[j];
        }
        for pj in p.iter_mut() {
            *pj /= sum_exp;
        }

        for j in 0..c {
            let mut d_p = 0.0;
            for x in 0..d {
                d_p += d_out[i * d + x] * v[j * d + x];
            }
            let d_s = p[j] * (d_p - d_stat[i]);
            for x in 0..d {
                dq[i * d + x] += d_s * k[j * d + x] * scale;
                dk[j * d + x] += d_s * q[i * d + x] * scale;
                dv[j * d + x] += p[j] * d_out[i * d + x];
            }
        }
    }

    (dq, dk, dv, d_stat)
}

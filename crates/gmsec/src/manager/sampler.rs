// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host resource sampling for C2CX resource messages.
//!
//! [`ResourceSampler`] is the platform seam; [`SystemSampler`] reads Linux
//! `/proc`, `statvfs` and the interface list. [`ResourceWindow`] keeps the
//! last `average / sample` samples and averages them into message fields.
//!
//! ```text
//! sample():  /proc/stat     -> CPU.TOTAL.UTIL, CPU.n.UTIL   (delta since previous call)
//!            /proc/meminfo  -> MEM.*
//!            statvfs(mount) -> DISK.n.*
//!            interfaces     -> NET-PORT.n.*
//! ```

use crate::error::{Error, Result};
use crate::field::{Field, FieldValue};
use crate::message::Message;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One disk (mount point) in a sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskSample {
    pub name: String,
    /// Size in megabytes.
    pub size_mb: u64,
    /// Percent used.
    pub util: f32,
}

/// One network interface in a sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetPortSample {
    pub name: String,
    pub ip: String,
}

/// Point-in-time host statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSample {
    /// Percent, all CPUs.
    pub cpu_total_util: f32,
    /// Percent, per CPU.
    pub cpu_util: Vec<f32>,
    /// Bytes.
    pub mem_physical_total: u64,
    pub mem_physical_avail: u64,
    pub mem_virtual_total: u64,
    pub mem_virtual_avail: u64,
    pub disks: Vec<DiskSample>,
    pub net_ports: Vec<NetPortSample>,
}

impl ResourceSample {
    /// Percent of physical memory in use.
    pub fn mem_util(&self) -> f32 {
        if self.mem_physical_total == 0 {
            return 0.0;
        }
        let used = self.mem_physical_total.saturating_sub(self.mem_physical_avail);
        (used as f64 * 100.0 / self.mem_physical_total as f64) as f32
    }
}

/// Platform statistics source.
pub trait ResourceSampler: Send + Sync {
    fn sample(&self) -> Result<ResourceSample>;

    /// Operating system description for OPER-SYS.
    fn os_version(&self) -> String;
}

// ============================================================================
// System sampler
// ============================================================================

/// `/proc` based sampler.
pub struct SystemSampler {
    mounts: Vec<String>,
    previous_cpu: Mutex<Vec<CpuTimes>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

impl CpuTimes {
    fn util_since(&self, earlier: &CpuTimes) -> f32 {
        let total = self.total.saturating_sub(earlier.total);
        if total == 0 {
            return 0.0;
        }
        (self.busy.saturating_sub(earlier.busy) as f64 * 100.0 / total as f64) as f32
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new(vec!["/".to_string()])
    }
}

impl SystemSampler {
    /// Sampler reporting the given mount points as disks.
    pub fn new(mounts: Vec<String>) -> Self {
        Self {
            mounts,
            previous_cpu: Mutex::new(Vec::new()),
        }
    }

    fn cpu(&self, sample: &mut ResourceSample) -> Result<()> {
        let text = std::fs::read_to_string("/proc/stat")?;
        let now = parse_proc_stat(&text);
        let Some((total, per_cpu)) = now.split_first() else {
            return Err(Error::Configuration("/proc/stat has no cpu lines".into()));
        };

        let mut previous = self.previous_cpu.lock();
        let baseline: Vec<CpuTimes> = if previous.len() == now.len() {
            previous.clone()
        } else {
            vec![CpuTimes::default(); now.len()]
        };
        sample.cpu_total_util = total.util_since(&baseline[0]);
        sample.cpu_util = per_cpu
            .iter()
            .zip(&baseline[1..])
            .map(|(n, p)| n.util_since(p))
            .collect();
        *previous = now;
        Ok(())
    }

    fn memory(sample: &mut ResourceSample) -> Result<()> {
        let text = std::fs::read_to_string("/proc/meminfo")?;
        let info = parse_meminfo(&text);
        let kb = |key: &str| info.iter().find(|(k, _)| k == key).map_or(0, |(_, v)| *v) * 1024;
        sample.mem_physical_total = kb("MemTotal");
        sample.mem_physical_avail = kb("MemAvailable");
        sample.mem_virtual_total = kb("MemTotal") + kb("SwapTotal");
        sample.mem_virtual_avail = kb("MemAvailable") + kb("SwapFree");
        Ok(())
    }

    #[cfg(unix)]
    fn disk(mount: &str) -> Result<DiskSample> {
        let path = std::ffi::CString::new(mount)
            .map_err(|_| Error::Configuration(format!("mount point {:?} contains NUL", mount)))?;
        // SAFETY: statvfs is plain data and fully written on success.
        let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
        // SAFETY: path is NUL-terminated and st is a valid out-pointer.
        let rc = unsafe { libc::statvfs(path.as_ptr(), &mut st) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        let block = st.f_frsize as u64;
        let total = st.f_blocks as u64 * block;
        let free = st.f_bfree as u64 * block;
        let util = if total == 0 {
            0.0
        } else {
            (total.saturating_sub(free) as f64 * 100.0 / total as f64) as f32
        };
        Ok(DiskSample {
            name: mount.to_string(),
            size_mb: total / (1024 * 1024),
            util,
        })
    }

    #[cfg(not(unix))]
    fn disk(mount: &str) -> Result<DiskSample> {
        Err(Error::Configuration(format!(
            "disk statistics for {} are not supported on this platform",
            mount
        )))
    }

    fn network(sample: &mut ResourceSample) {
        match local_ip_address::list_afinet_netifas() {
            Ok(ifaces) => {
                sample.net_ports = ifaces
                    .into_iter()
                    .map(|(name, ip)| NetPortSample {
                        name,
                        ip: ip.to_string(),
                    })
                    .collect();
            }
            Err(e) => log::debug!("[resource] interface list unavailable: {}", e),
        }
    }
}

impl ResourceSampler for SystemSampler {
    fn sample(&self) -> Result<ResourceSample> {
        let mut sample = ResourceSample::default();
        if let Err(e) = self.cpu(&mut sample) {
            log::warn!("[resource] CPU statistics unavailable: {}", e);
        }
        if let Err(e) = Self::memory(&mut sample) {
            log::warn!("[resource] memory statistics unavailable: {}", e);
        }
        for mount in &self.mounts {
            match Self::disk(mount) {
                Ok(disk) => sample.disks.push(disk),
                Err(e) => log::warn!("[resource] disk statistics for {} unavailable: {}", mount, e),
            }
        }
        Self::network(&mut sample);
        Ok(sample)
    }

    fn os_version(&self) -> String {
        os_version()
    }
}

#[cfg(unix)]
fn os_version() -> String {
    // SAFETY: utsname is plain data and fully written on success.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    // SAFETY: uts is a valid out-pointer.
    if unsafe { libc::uname(&mut uts) } != 0 {
        return std::env::consts::OS.to_string();
    }
    let text = |raw: &[libc::c_char]| {
        let bytes: Vec<u8> = raw
            .iter()
            .take_while(|c| **c != 0)
            .map(|c| *c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    };
    format!(
        "OS version:  {} {} {} {}",
        text(&uts.sysname[..]),
        text(&uts.release[..]),
        text(&uts.version[..]),
        text(&uts.machine[..]),
    )
}

#[cfg(not(unix))]
fn os_version() -> String {
    format!("OS version:  {}", std::env::consts::OS)
}

/// `cpu` lines of `/proc/stat`, aggregate line first.
fn parse_proc_stat(text: &str) -> Vec<CpuTimes> {
    text.lines()
        .filter(|l| l.starts_with("cpu"))
        .map(|line| {
            let values: Vec<u64> = line
                .split_whitespace()
                .skip(1)
                .filter_map(|v| v.parse().ok())
                .collect();
            // user nice system idle iowait irq softirq steal ...
            let total: u64 = values.iter().take(8).sum();
            let idle = values.get(3).copied().unwrap_or(0) + values.get(4).copied().unwrap_or(0);
            CpuTimes {
                busy: total.saturating_sub(idle),
                total,
            }
        })
        .collect()
}

/// `Key: value kB` lines of `/proc/meminfo`.
fn parse_meminfo(text: &str) -> Vec<(String, u64)> {
    text.lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim().to_string(), value))
        })
        .collect()
}

// ============================================================================
// Moving average
// ============================================================================

/// The last `capacity` samples.
#[derive(Debug, Clone)]
pub(crate) struct ResourceWindow {
    capacity: usize,
    samples: VecDeque<ResourceSample>,
}

impl ResourceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::new(),
        }
    }

    /// Window size for the given intervals (seconds).
    pub fn capacity_for(sample_s: u64, average_s: u64) -> usize {
        (average_s / sample_s.max(1)).max(1) as usize
    }

    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn push(&mut self, sample: ResourceSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    fn mean_f32(&self, f: impl Fn(&ResourceSample) -> Option<f32>) -> Option<f32> {
        let values: Vec<f32> = self.samples.iter().filter_map(f).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f32>() / values.len() as f32)
        }
    }

    fn mean_u64(&self, f: impl Fn(&ResourceSample) -> Option<u64>) -> Option<u64> {
        let values: Vec<u64> = self.samples.iter().filter_map(f).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<u64>() / values.len() as u64)
        }
    }

    /// Add the averaged statistics to `msg`. `legacy` selects the 2014 ISD
    /// field types.
    pub fn add_fields(&self, msg: &mut Message, legacy: bool) -> Result<()> {
        let Some(latest) = self.samples.back() else {
            return Ok(());
        };
        let count = |n: usize| {
            if legacy {
                FieldValue::I16(n.min(i16::MAX as usize) as i16)
            } else {
                FieldValue::U16(n.min(u16::MAX as usize) as u16)
            }
        };
        let amount = |v: u64| {
            if legacy {
                FieldValue::I32(v.min(i32::MAX as u64) as i32)
            } else {
                FieldValue::U64(v)
            }
        };

        // CPU
        if let Some(total) = self.mean_f32(|s| Some(s.cpu_total_util)) {
            msg.add("CPU.TOTAL.UTIL", total)?;
        }
        msg.add_field(Field::new("NUM-OF-CPUS", count(latest.cpu_util.len())))?;
        for i in 0..latest.cpu_util.len() {
            if let Some(util) = self.mean_f32(|s| s.cpu_util.get(i).copied()) {
                msg.add(&format!("CPU.{}.UTIL", i + 1), util)?;
            }
        }

        // Memory
        if let Some(util) = self.mean_f32(|s| Some(s.mem_util())) {
            msg.add("MEM.UTIL", util)?;
        }
        let memory: [(&str, fn(&ResourceSample) -> u64); 4] = [
            ("MEM.PHYSICAL.TOTAL", |s| s.mem_physical_total),
            ("MEM.PHYSICAL.AVAIL", |s| s.mem_physical_avail),
            ("MEM.VIRTUAL.TOTAL", |s| s.mem_virtual_total),
            ("MEM.VIRTUAL.AVAIL", |s| s.mem_virtual_avail),
        ];
        for (name, get) in memory {
            if let Some(v) = self.mean_u64(|s| Some(get(s))) {
                msg.add_field(Field::new(name, amount(v)))?;
            }
        }

        // Disks
        msg.add_field(Field::new("NUM-OF-DISKS", count(latest.disks.len())))?;
        for (i, disk) in latest.disks.iter().enumerate() {
            let n = i + 1;
            let size = self
                .mean_u64(|s| s.disks.get(i).map(|d| d.size_mb))
                .unwrap_or(disk.size_mb);
            let util = self
                .mean_f32(|s| s.disks.get(i).map(|d| d.util))
                .unwrap_or(disk.util);
            msg.add(&format!("DISK.{}.NAME", n), disk.name.as_str())?;
            let size = if legacy {
                FieldValue::I32(size.min(i32::MAX as u64) as i32)
            } else {
                FieldValue::U32(size.min(u32::MAX as u64) as u32)
            };
            msg.add_field(Field::new(format!("DISK.{}.SIZE", n), size))?;
            msg.add(&format!("DISK.{}.UTIL", n), util)?;
        }

        // Network
        msg.add_field(Field::new("NUM-OF-NET-PORTS", count(latest.net_ports.len())))?;
        for (i, port) in latest.net_ports.iter().enumerate() {
            msg.add(&format!("NET-PORT.{}.NAME", i + 1), port.name.as_str())?;
            msg.add(&format!("NET-PORT.{}.IP-ADR", i + 1), port.ip.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn sample(cpu: f32, avail: u64) -> ResourceSample {
        ResourceSample {
            cpu_total_util: cpu,
            cpu_util: vec![cpu, cpu],
            mem_physical_total: 1000,
            mem_physical_avail: avail,
            mem_virtual_total: 2000,
            mem_virtual_avail: 1500,
            disks: vec![DiskSample {
                name: "/".into(),
                size_mb: 512,
                util: 50.0,
            }],
            net_ports: vec![NetPortSample {
                name: "lo".into(),
                ip: "127.0.0.1".into(),
            }],
        }
    }

    #[test]
    fn test_parse_proc_stat() {
        let text = "cpu  10 0 10 70 10 0 0 0 0 0\ncpu0 5 0 5 35 5 0 0 0\nintr 1 2 3\n";
        let cpus = parse_proc_stat(text);
        assert_eq!(cpus.len(), 2);
        assert_eq!(cpus[0], CpuTimes { busy: 20, total: 100 });
        let later = CpuTimes { busy: 70, total: 200 };
        assert_eq!(later.util_since(&cpus[0]), 50.0);
    }

    #[test]
    fn test_parse_meminfo() {
        let info = parse_meminfo("MemTotal:  2048 kB\nMemAvailable: 1024 kB\nbogus\n");
        assert_eq!(info, vec![("MemTotal".into(), 2048), ("MemAvailable".into(), 1024)]);
    }

    #[test]
    fn test_window_averages_and_evicts() {
        let mut window = ResourceWindow::new(ResourceWindow::capacity_for(1, 2));
        window.push(sample(100.0, 0));
        window.push(sample(20.0, 1000));
        window.push(sample(40.0, 1000));
        assert_eq!(window.len(), 2);

        let mut msg = Message::new("GMSEC.RSRC", MessageKind::Publish);
        window.add_fields(&mut msg, false).unwrap();
        assert_eq!(msg.get_f64_value("CPU.TOTAL.UTIL").unwrap(), 30.0);
        assert_eq!(msg.get_f64_value("MEM.UTIL").unwrap(), 0.0);
        assert_eq!(msg.get_u64_value("NUM-OF-CPUS").unwrap(), 2);
        assert_eq!(msg.get_string_value("DISK.1.NAME").unwrap(), "/");
        assert_eq!(msg.get_string_value("NET-PORT.1.IP-ADR").unwrap(), "127.0.0.1");
    }

    #[test]
    fn test_window_resize_keeps_newest() {
        let mut window = ResourceWindow::new(4);
        for cpu in [1.0, 2.0, 3.0, 4.0] {
            window.push(sample(cpu, 0));
        }
        window.resize(1);
        let mut msg = Message::new("GMSEC.RSRC", MessageKind::Publish);
        window.add_fields(&mut msg, true).unwrap();
        assert_eq!(msg.get_f64_value("CPU.TOTAL.UTIL").unwrap(), 4.0);
    }

    #[test]
    fn test_mem_util() {
        assert_eq!(sample(0.0, 250).mem_util(), 75.0);
        assert_eq!(ResourceSample::default().mem_util(), 0.0);
    }
}

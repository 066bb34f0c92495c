pub fn render_index() -> String {
    INDEX_HTML.replace("{{VERSION}}", env!("CARGO_PKG_VERSION"))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Consumos Womack y Bodymaker</title>
  <style>
    :root {
      --bg: #eef2f5;
      --ink: #1f2a33;
      --muted: #6b7a86;
      --card: #ffffff;
      --line1: #1e78c8;
      --line2: #e0772b;
      --oil1: #2f9e6e;
      --oil2: #b84a8a;
      --ok: #1d8a4f;
      --error: #c0392b;
      --shadow: 0 12px 32px rgba(31, 42, 51, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Trebuchet MS", sans-serif;
    }

    header {
      display: flex;
      align-items: center;
      justify-content: space-between;
      padding: 18px 28px;
      background: var(--ink);
      color: #fff;
    }

    header h1 {
      margin: 0;
      font-size: 1.2rem;
    }

    nav button {
      background: transparent;
      border: 1px solid rgba(255, 255, 255, 0.4);
      color: #fff;
      border-radius: 999px;
      padding: 6px 14px;
      margin-left: 6px;
      cursor: pointer;
    }

    nav button.active {
      background: #fff;
      color: var(--ink);
    }

    main {
      width: min(1100px, 100%);
      margin: 0 auto;
      padding: 24px 18px 48px;
    }

    .card {
      background: var(--card);
      border-radius: 16px;
      box-shadow: var(--shadow);
      padding: 22px;
      margin-bottom: 22px;
    }

    .card h2 {
      margin: 0 0 6px;
      font-size: 1.05rem;
    }

    .card p.sub {
      margin: 0 0 14px;
      color: var(--muted);
      font-size: 0.9rem;
    }

    .view {
      display: none;
    }

    .view.active {
      display: block;
    }

    .legend span {
      display: inline-flex;
      align-items: center;
      margin-right: 14px;
      font-size: 0.85rem;
    }

    .legend i {
      width: 12px;
      height: 12px;
      border-radius: 3px;
      margin-right: 6px;
      display: inline-block;
    }

    svg {
      width: 100%;
      height: auto;
    }

    .chart-grid {
      stroke: #dde3e8;
    }

    .chart-label {
      fill: var(--muted);
      font-size: 11px;
    }

    form {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(170px, 1fr));
      gap: 12px;
      align-items: end;
    }

    label {
      display: grid;
      gap: 4px;
      font-size: 0.85rem;
      color: var(--muted);
    }

    input,
    select {
      padding: 8px 10px;
      border: 1px solid #c9d2d9;
      border-radius: 8px;
      font-size: 0.95rem;
    }

    button.primary {
      background: var(--line1);
      color: #fff;
      border: none;
      border-radius: 8px;
      padding: 10px 16px;
      font-size: 0.95rem;
      cursor: pointer;
    }

    .status {
      min-height: 1.4em;
      margin-top: 10px;
      font-size: 0.9rem;
    }

    .status[data-type="ok"] {
      color: var(--ok);
    }

    .status[data-type="error"] {
      color: var(--error);
    }

    .tables {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 18px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.85rem;
    }

    th,
    td {
      text-align: left;
      padding: 6px 8px;
      border-bottom: 1px solid #e6ebef;
    }

    .loading {
      text-align: center;
      padding: 80px 0;
      color: var(--muted);
    }

    footer {
      text-align: center;
      color: var(--muted);
      font-size: 0.75rem;
    }
  </style>
</head>
<body>
  <header>
    <h1>Consumos de planta</h1>
    <nav>
      <button type="button" data-view="dashboard" class="active">Panel</button>
      <button type="button" data-view="daily">Womack (diario)</button>
      <button type="button" data-view="weekly">Bodymaker (semanal)</button>
    </nav>
  </header>

  <main>
    <div class="loading" id="loading">Cargando sesión...</div>

    <section class="view" id="view-dashboard">
      <div class="card">
        <h2>Womack: últimos 7 días</h2>
        <p class="sub">Agua y aceite total por línea, sumados por día.</p>
        <div class="legend">
          <span><i style="background: var(--line1)"></i>Agua L1</span>
          <span><i style="background: var(--line2)"></i>Agua L2</span>
          <span><i style="background: var(--oil1)"></i>Aceite L1</span>
          <span><i style="background: var(--oil2)"></i>Aceite L2</span>
        </div>
        <svg id="daily-chart" viewBox="0 0 720 280"></svg>
      </div>
      <div class="card">
        <h2>Bodymaker: última semana por línea</h2>
        <p class="sub" id="weekly-subtitle">Consumo de aceite por máquina.</p>
        <div class="legend">
          <span><i style="background: var(--line1)"></i>Línea 1</span>
          <span><i style="background: var(--line2)"></i>Línea 2</span>
        </div>
        <svg id="weekly-chart" viewBox="0 0 720 280"></svg>
      </div>
    </section>

    <section class="view" id="view-daily">
      <div class="card">
        <h2>Registro diario Womack</h2>
        <form id="daily-form">
          <label>Fecha<input type="date" name="date" /></label>
          <label>Línea
            <select name="line"><option value="1">Línea 1</option><option value="2">Línea 2</option></select>
          </label>
          <label>Agua (m³)<input type="number" step="any" min="0" name="waterConsumption" /></label>
          <label>Aceite total (L)<input type="number" step="any" min="0" name="oilConsumptionTotal" /></label>
          <label>Aceite parcial (L)<input type="number" step="any" min="0" name="oilConsumptionPartial" /></label>
          <button class="primary" type="submit">Guardar</button>
        </form>
        <div class="status" id="daily-status"></div>
      </div>
      <div class="card tables">
        <div><h2>Línea 1</h2><table id="daily-table-1"></table></div>
        <div><h2>Línea 2</h2><table id="daily-table-2"></table></div>
      </div>
    </section>

    <section class="view" id="view-weekly">
      <div class="card">
        <h2>Registro semanal Bodymaker</h2>
        <form id="weekly-form">
          <label>Semana (lunes)<input type="date" name="weekStartDate" /></label>
          <label>Línea
            <select name="line" id="weekly-line"><option value="1">Línea 1</option><option value="2">Línea 2</option></select>
          </label>
          <div id="machine-inputs" style="display: contents"></div>
          <button class="primary" type="submit">Guardar</button>
        </form>
        <div class="status" id="weekly-status"></div>
      </div>
      <div class="card tables">
        <div><h2>Línea 1</h2><table id="weekly-table-1"></table></div>
        <div><h2>Línea 2</h2><table id="weekly-table-2"></table></div>
      </div>
    </section>

    <footer>v{{VERSION}}</footer>
  </main>

  <script>
    const views = ['dashboard', 'daily', 'weekly'];
    const navButtons = Array.from(document.querySelectorAll('nav button'));
    const loadingEl = document.getElementById('loading');
    let activeView = 'dashboard';
    let ready = false;

    const setStatus = (el, message, type) => {
      clearTimeout(el._statusTimer);
      el.textContent = message;
      el.dataset.type = type || '';
      if (message) {
        el._statusTimer = setTimeout(() => {
          el.textContent = '';
          el.dataset.type = '';
        }, 3000);
      }
    };

    const showView = (view) => {
      activeView = view;
      navButtons.forEach((button) => button.classList.toggle('active', button.dataset.view === view));
      views.forEach((name) => {
        document.getElementById(`view-${name}`).classList.toggle('active', ready && name === view);
      });
      if (ready) {
        refresh(view).catch(() => {});
      }
    };

    const formatAxisValue = (value) => {
      const rounded = Math.round(value * 10) / 10;
      return Number.isInteger(rounded) ? rounded.toString() : rounded.toFixed(1);
    };

    const renderBars = (svg, groups, series, emptyText) => {
      if (!groups.length) {
        svg.innerHTML = `<text class="chart-label" x="50%" y="50%" text-anchor="middle">${emptyText}</text>`;
        return;
      }

      const width = 720;
      const height = 280;
      const paddingX = 48;
      const paddingY = 34;
      const top = 16;
      const max = Math.max(1, ...groups.flatMap((group) => series.map((s) => group[s.key] || 0)));
      const scaleY = (height - top - paddingY) / max;
      const groupWidth = (width - paddingX * 2) / groups.length;
      const barWidth = Math.max(4, (groupWidth * 0.8) / series.length);

      let grid = '';
      for (let i = 0; i <= 4; i += 1) {
        const value = (max * i) / 4;
        const y = height - paddingY - value * scaleY;
        grid += `<line class="chart-grid" x1="${paddingX}" y1="${y}" x2="${width - paddingX}" y2="${y}" />`;
        grid += `<text class="chart-label" x="${paddingX - 8}" y="${y + 4}" text-anchor="end">${formatAxisValue(value)}</text>`;
      }

      const bars = groups
        .map((group, index) => {
          const x0 = paddingX + index * groupWidth + groupWidth * 0.1;
          const rects = series
            .map((s, i) => {
              const value = group[s.key] || 0;
              const h = value * scaleY;
              return `<rect x="${x0 + i * barWidth}" y="${height - paddingY - h}" width="${barWidth - 2}" height="${h}" fill="${s.color}"><title>${s.key}: ${value}</title></rect>`;
            })
            .join('');
          const label = `<text class="chart-label" x="${x0 + (barWidth * series.length) / 2}" y="${height - paddingY + 16}" text-anchor="middle">${group.label}</text>`;
          return rects + label;
        })
        .join('');

      svg.innerHTML = grid + bars;
    };

    const getJson = async (url) => {
      const res = await fetch(url);
      if (!res.ok) {
        throw new Error(await res.text());
      }
      return res.json();
    };

    const loadDashboard = async () => {
      const data = await getJson('/api/dashboard');
      renderBars(
        document.getElementById('daily-chart'),
        data.daily.map((row) => ({ ...row, label: row.name })),
        [
          { key: 'Agua L1', color: 'var(--line1)' },
          { key: 'Agua L2', color: 'var(--line2)' },
          { key: 'Aceite L1', color: 'var(--oil1)' },
          { key: 'Aceite L2', color: 'var(--oil2)' }
        ],
        'Sin registros diarios'
      );
      renderBars(
        document.getElementById('weekly-chart'),
        data.weekly.map((row) => ({ ...row, label: `BM ${row.machineId}` })),
        [
          { key: 'consumptionLine1', color: 'var(--line1)' },
          { key: 'consumptionLine2', color: 'var(--line2)' }
        ],
        'Sin registros semanales'
      );
      document.getElementById('weekly-subtitle').textContent =
        `Línea 1: ${data.line1Week || '—'} · Línea 2: ${data.line2Week || '—'}`;
    };

    const fillTable = (id, headers, rows) => {
      const head = `<tr>${headers.map((h) => `<th>${h}</th>`).join('')}</tr>`;
      const body = rows.length
        ? rows.map((cells) => `<tr>${cells.map((c) => `<td>${c}</td>`).join('')}</tr>`).join('')
        : `<tr><td colspan="${headers.length}">Sin registros</td></tr>`;
      document.getElementById(id).innerHTML = head + body;
    };

    const loadDaily = async () => {
      const data = await getJson('/api/daily');
      const headers = ['Fecha', 'Agua', 'Aceite total', 'Aceite parcial'];
      const cells = (row) => [row.date, row.waterConsumption, row.oilConsumptionTotal, row.oilConsumptionPartial];
      fillTable('daily-table-1', headers, data.line1.map(cells));
      fillTable('daily-table-2', headers, data.line2.map(cells));
    };

    const loadWeekly = async () => {
      const data = await getJson('/api/weekly');
      const headers = ['Semana', 'Lecturas'];
      const cells = (row) => [
        row.weekStartDate,
        row.readings.map((r) => `BM ${r.machineId}: ${r.consumption}`).join(', ')
      ];
      fillTable('weekly-table-1', headers, data.line1.map(cells));
      fillTable('weekly-table-2', headers, data.line2.map(cells));
    };

    const loadMachines = async () => {
      const line = document.getElementById('weekly-line').value;
      const data = await getJson(`/api/machines?line=${line}`);
      document.getElementById('machine-inputs').innerHTML = data.machines
        .map((id) => `<label>BM ${id}<input type="number" step="any" min="0" data-machine="${id}" /></label>`)
        .join('');
    };

    const refresh = async (view) => {
      if (view === 'daily') {
        await loadDaily();
      } else if (view === 'weekly') {
        await loadWeekly();
      } else {
        await loadDashboard();
      }
    };

    const post = async (url, body) => {
      const res = await fetch(url, {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify(body)
      });
      const text = await res.text();
      if (!res.ok) {
        throw new Error(text || 'Error al guardar');
      }
      return JSON.parse(text);
    };

    const dailyForm = document.getElementById('daily-form');
    dailyForm.addEventListener('submit', (event) => {
      event.preventDefault();
      const statusEl = document.getElementById('daily-status');
      const body = Object.fromEntries(new FormData(dailyForm).entries());
      post('/api/daily', body)
        .then((res) => {
          dailyForm.reset();
          setStatus(statusEl, res.message, 'ok');
        })
        .catch((err) => setStatus(statusEl, err.message, 'error'));
    });

    const weeklyForm = document.getElementById('weekly-form');
    weeklyForm.addEventListener('submit', (event) => {
      event.preventDefault();
      const statusEl = document.getElementById('weekly-status');
      const consumptionsByMachine = {};
      weeklyForm.querySelectorAll('input[data-machine]').forEach((input) => {
        consumptionsByMachine[input.dataset.machine] = input.value;
      });
      const body = {
        weekStartDate: weeklyForm.elements.weekStartDate.value,
        line: weeklyForm.elements.line.value,
        consumptionsByMachine
      };
      post('/api/weekly', body)
        .then((res) => {
          weeklyForm.reset();
          loadMachines().catch(() => {});
          setStatus(statusEl, res.message, 'ok');
        })
        .catch((err) => setStatus(statusEl, err.message, 'error'));
    });

    document.getElementById('weekly-line').addEventListener('change', () => {
      loadMachines().catch(() => {});
    });

    navButtons.forEach((button) => {
      button.addEventListener('click', () => showView(button.dataset.view));
    });

    const listen = () => {
      const events = new EventSource('/api/events');
      events.addEventListener('daily', () => {
        if (activeView !== 'weekly') {
          refresh(activeView).catch(() => {});
        }
      });
      events.addEventListener('weekly', () => {
        if (activeView !== 'daily') {
          refresh(activeView).catch(() => {});
        }
      });
    };

    const waitForSession = async () => {
      const session = await getJson('/api/session');
      if (!session.ready) {
        setTimeout(() => waitForSession().catch(() => {}), 500);
        return;
      }
      ready = true;
      loadingEl.style.display = 'none';
      await loadMachines();
      listen();
      showView(activeView);
    };

    waitForSession().catch(() => setTimeout(() => waitForSession().catch(() => {}), 1000));
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_has_all_views() {
        let html = render_index();
        for id in ["view-dashboard", "view-daily", "view-weekly"] {
            assert!(html.contains(id), "missing {id}");
        }
        assert!(!html.contains("{{VERSION}}"));
    }

    #[test]
    fn status_timer_is_reset_on_each_message() {
        let html = render_index();
        let clear = html.find("clearTimeout(el._statusTimer)").expect("timer not cleared");
        let set = html.find("el._statusTimer = setTimeout").expect("timer not stored");
        assert!(clear < set);
    }
}
